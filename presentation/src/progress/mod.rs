//! Live progress rendering while an answer streams

pub mod observer;
