pub mod event;
pub mod page;
pub mod sequencer;
pub mod stage;
pub mod timer;
