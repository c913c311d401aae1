pub(crate) mod admin;
pub(crate) mod auth;
pub(crate) mod errors;
pub(crate) mod guards;
pub(crate) mod handlers;
pub(crate) mod pagination;
pub(crate) mod problems;
pub(crate) mod router;
pub(crate) mod submissions;
pub(crate) mod users;
