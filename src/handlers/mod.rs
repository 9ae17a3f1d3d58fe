// handlers/mod.rs - Two handler tiers
//
// Public (no session) → Protected (behind the identity gate)

pub mod multipart;
pub mod protected;
pub mod public;
