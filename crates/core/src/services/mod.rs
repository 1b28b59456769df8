pub mod analytics_service;
pub mod portfolio_service;
pub mod price_service;
pub mod rebalance_service;
pub mod storage_cost_service;
