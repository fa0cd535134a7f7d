mod common;

mod merge;
