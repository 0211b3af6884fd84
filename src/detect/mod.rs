// Environment detection: container runtime, distribution, and resolution
// of the `auto` installation preference.

pub mod container;
