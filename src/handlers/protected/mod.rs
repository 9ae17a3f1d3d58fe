// handlers/protected/mod.rs - Handlers behind the identity gate
//
// Every handler here receives a `CurrentSession` extension, except the login
// view which also serves signed-out visitors.

pub mod admin;
pub mod session;
pub mod shell;
pub mod storage;
