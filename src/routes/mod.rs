// Export all route modules
pub mod campaigns;
pub mod profiles;
pub mod sponsorship_requests;

// Re-export all route handlers for easy importing
pub use campaigns::*;
pub use profiles::*;
pub use sponsorship_requests::*;
