pub mod backup;
pub mod feed;
pub mod items;
pub mod refresh;
pub mod watch;
