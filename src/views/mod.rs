pub mod dashboard;
pub mod detail;
pub mod home;

pub use dashboard::{load_dashboard, Dashboard};
pub use detail::{parse_bid_amount, DetailPhase, DetailSnapshot, ListingDetail, Notice};
pub use home::{
    category_counts, featured, CategoryCount, FeaturedWindow, HomeSnapshot, HomeView,
    ListingCard, RequestToken,
};
