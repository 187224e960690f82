pub mod account;
pub mod option;
pub mod poll;
pub mod vote;
