//! Domain services: pricing, quantity tiers, invoice normalization
pub mod invoice;
pub mod pricing;
pub mod tiering;

pub use invoice::{InvoiceLine, InvoiceNormalizer, InvoiceTotals, LocationAdjustment, NormalizedInvoice, TaxBreakdown};
pub use pricing::{currency_symbol, display_price, LocationPricing, PriceQuote};
pub use tiering::{QuantityTier, SizeConfigurator, TierQuote, TierRange, TierSchedule};
