mod update;

pub use update::{PayloadSource, UpdateArgs, cmd_update};
