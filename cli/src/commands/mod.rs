mod helpers;
mod search;

pub(crate) use search::{cmd_search, cmd_show};
