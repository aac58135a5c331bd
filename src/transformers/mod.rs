pub mod do_nothing;

pub use do_nothing::DoNothing;
