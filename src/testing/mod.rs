//! A stand-in for the turtle simulator, speaking the same protocol over udp.

pub mod turtle_sim;
