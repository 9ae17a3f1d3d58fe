// handlers/public/mod.rs - Public handlers (no session required)
//
// Site content reads, the contact form, sign-in and locally stored media.

pub mod contact;
pub mod content;
pub mod login;
pub mod media;
pub mod root;
