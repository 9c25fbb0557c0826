pub mod no_output;
pub mod subaru_legacy;
