pub mod certificate_view;
pub mod progress;
