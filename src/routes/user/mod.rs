mod handler;

pub use handler::{get_user, update_me};
