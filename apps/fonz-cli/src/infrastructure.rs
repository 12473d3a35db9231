pub mod looker;
