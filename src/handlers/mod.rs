// Route handlers. Each module maps one resource; handlers stay thin and
// delegate to the service layer, converting errors through ApiError.
pub mod journal;
pub mod system;
