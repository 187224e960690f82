pub mod identity;
pub mod option;
pub mod poll;
pub mod vote;
