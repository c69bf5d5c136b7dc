/// Pure game rules: no terminal, no clock, no audio.

pub mod candles;
pub mod confetti;
pub mod journey;
pub mod memory;
pub mod puzzle;
