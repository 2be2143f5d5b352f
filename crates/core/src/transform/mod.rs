mod eliminate;
mod merge;

pub use eliminate::MethodPattern;
