//! Rules that do not need a database: folder hierarchy, move planning,
//! collaboration lifecycle, contract rendering, note ordering and EPK input.

pub mod box_id;
pub mod collaboration;
pub mod contracts;
pub mod epk;
pub mod folders;
pub mod moves;
pub mod notes;
pub mod projects;
