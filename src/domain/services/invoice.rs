//! Invoice normalization
//!
//! The order backend has shipped several invoice shapes over time: the same
//! concept can sit under different keys, amounts may be numbers or numeric
//! strings, and some fields are simply missing. Everything is resolved here,
//! once, through an ordered fallback chain per field so that rendering and PDF
//! export only ever see [`NormalizedInvoice`].
//!
//! The subtotal is always recomputed from the line items. Tax and the location
//! adjustment are charged on the taxable base (subtotal + packaging + printing).

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::warn;

use crate::domain::value_objects::{parse_decimal, percent_of, round_money, CurrencyCode};
use crate::StorefrontError;

/// GST rate used when the invoice does not carry one.
pub const DEFAULT_GST_RATE: Decimal = Decimal::from_parts(18, 0, 0, false, 0);

const ITEMS: &[&str] = &["items", "lineItems", "products"];
const ITEM_NAME: &[&str] = &["name", "productName", "title"];
const ITEM_QTY: &[&str] = &["quantity", "qty"];
const ITEM_SIZES: &[&str] = &["sizes", "sizeQuantities"];
const ITEM_PRICE: &[&str] = &["price", "unitPrice", "unit_price"];
const PACKAGING: &[&str] = &["packagingCharge", "packaging_charge"];
const PRINTING: &[&str] = &["printingCharge", "printing_charge"];
const GST_RATE: &[&str] = &["gstRate", "gst_rate", "taxRate"];
const CGST_RATE: &[&str] = &["cgstRate", "cgst_rate"];
const SGST_RATE: &[&str] = &["sgstRate", "sgst_rate"];
const LOCATION_OBJECT: &[&str] = &["locationAdjustment", "location_adjustment"];
const LOCATION_PERCENT: &[&str] = &["percent", "percentage"];
const LOCATION_FLAT_PERCENT: &[&str] = &["locationPercentage", "location_percentage"];
const COUNTRY: &[&str] = &["country", "countryCode"];
const BACKEND_TOTAL: &[&str] = &["grandTotal", "totalAmount", "total"];
const INVOICE_NUMBER: &[&str] = &["invoiceNumber", "invoice_number", "invoiceNo"];
const INVOICE_DATE: &[&str] = &["invoiceDate", "createdAt", "date"];

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaxBreakdown {
    pub cgst_rate: Decimal,
    pub cgst_amount: Decimal,
    pub sgst_rate: Decimal,
    pub sgst_amount: Decimal,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationAdjustment {
    pub percent: Decimal,
    pub country: Option<String>,
    pub amount: Decimal,
}

/// Frozen totals. `grand_total` is always the sum of the other components.
/// Amounts that do not fit a `Decimal` are dropped while normalizing, so the
/// component sum is always representable.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceTotals {
    pub subtotal: Decimal,
    pub packaging_charge: Decimal,
    pub printing_charge: Decimal,
    pub tax: TaxBreakdown,
    pub location_adjustment: LocationAdjustment,
    /// Backend total minus the locally computed components, when the backend total wins.
    pub balance_adjustment: Decimal,
    pub grand_total: Decimal,
}

impl InvoiceTotals {
    pub fn taxable_base(&self) -> Option<Decimal> {
        self.subtotal.checked_add(self.packaging_charge)?.checked_add(self.printing_charge)
    }

    pub fn component_sum(&self) -> Option<Decimal> {
        self.taxable_base()?
            .checked_add(self.tax.cgst_amount)?
            .checked_add(self.tax.sgst_amount)?
            .checked_add(self.location_adjustment.amount)?
            .checked_add(self.balance_adjustment)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceLine {
    pub description: String,
    pub quantity: u32,
    pub unit_price: Decimal,
    pub amount: Decimal,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedInvoice {
    pub order_id: String,
    pub invoice_number: String,
    pub issued_at: Option<String>,
    pub currency: CurrencyCode,
    pub lines: Vec<InvoiceLine>,
    pub totals: InvoiceTotals,
}

#[derive(Clone, Debug)]
pub struct InvoiceNormalizer {
    default_gst_rate: Decimal,
}

impl Default for InvoiceNormalizer {
    fn default() -> Self { Self { default_gst_rate: DEFAULT_GST_RATE } }
}

impl InvoiceNormalizer {
    pub fn new(default_gst_rate: Decimal) -> Self { Self { default_gst_rate } }

    /// Fails when there is no order id or no invoice; no partial invoice is produced.
    pub fn normalize(&self, order_id: Option<&str>, raw: Option<&Value>) -> Result<NormalizedInvoice, StorefrontError> {
        let order_id = order_id.map(str::trim).filter(|id| !id.is_empty()).ok_or(StorefrontError::MissingOrderId)?;
        let invoice = raw
            .map(unwrap_envelope)
            .and_then(Value::as_object)
            .ok_or_else(|| StorefrontError::InvoiceNotFound(order_id.to_string()))?;

        let lines: Vec<InvoiceLine> = first(invoice, ITEMS)
            .and_then(Value::as_array)
            .map(|items| normalize_lines(items))
            .unwrap_or_default();

        let totals = self.totals(invoice, &lines);

        Ok(NormalizedInvoice {
            order_id: order_id.to_string(),
            invoice_number: text(invoice, INVOICE_NUMBER).unwrap_or_else(|| order_id.to_string()),
            issued_at: text(invoice, INVOICE_DATE),
            currency: text(invoice, &["currency"]).and_then(|c| CurrencyCode::new(c).ok()).unwrap_or_default(),
            lines,
            totals,
        })
    }

    fn totals(&self, invoice: &Map<String, Value>, lines: &[InvoiceLine]) -> InvoiceTotals {
        // lines come from normalize_lines, so the sum fits
        let subtotal: Decimal = lines.iter().map(|l| l.amount).sum();
        self.charged(invoice, subtotal).unwrap_or_else(|| {
            warn!(%subtotal, "Invoice charges overflow, showing the item subtotal only");
            InvoiceTotals { subtotal, grand_total: subtotal, ..InvoiceTotals::default() }
        })
    }

    /// `None` when a charge, a tax amount or the location adjustment does not fit.
    fn charged(&self, invoice: &Map<String, Value>, subtotal: Decimal) -> Option<InvoiceTotals> {
        let packaging_charge = round_money(decimal(invoice, PACKAGING).unwrap_or_default());
        let printing_charge = round_money(decimal(invoice, PRINTING).unwrap_or_default());
        let taxable = subtotal.checked_add(packaging_charge)?.checked_add(printing_charge)?;

        let gst_rate = decimal(invoice, GST_RATE).unwrap_or(self.default_gst_rate);
        let (cgst_rate, sgst_rate) = match (decimal(invoice, CGST_RATE), decimal(invoice, SGST_RATE)) {
            (Some(cgst), Some(sgst)) => (cgst, sgst),
            _ => (gst_rate / Decimal::TWO, gst_rate / Decimal::TWO),
        };
        let tax = TaxBreakdown {
            cgst_rate,
            cgst_amount: round_money(percent_of(taxable, cgst_rate)?),
            sgst_rate,
            sgst_amount: round_money(percent_of(taxable, sgst_rate)?),
        };

        let location_adjustment = location_adjustment(invoice, taxable)?;

        let mut totals = InvoiceTotals {
            subtotal,
            packaging_charge,
            printing_charge,
            tax,
            location_adjustment,
            balance_adjustment: Decimal::ZERO,
            grand_total: Decimal::ZERO,
        };
        let computed = totals.component_sum()?;
        totals.grand_total = computed;
        if let Some(reported) = decimal(invoice, BACKEND_TOTAL).filter(|t| !t.is_zero()).map(round_money) {
            match reported.checked_sub(computed) {
                Some(balance) => {
                    totals.grand_total = reported;
                    totals.balance_adjustment = balance;
                }
                None => warn!(%reported, %computed, "Ignoring unusable backend invoice total"),
            }
        }
        Some(totals)
    }
}

fn unwrap_envelope(raw: &Value) -> &Value {
    match raw.get("invoice") {
        Some(inner) if inner.is_object() => inner,
        _ => raw,
    }
}

/// A line that would push the subtotal past `Decimal::MAX` is priced at zero.
fn normalize_lines(items: &[Value]) -> Vec<InvoiceLine> {
    let mut subtotal = Decimal::ZERO;
    items
        .iter()
        .filter_map(Value::as_object)
        .map(normalize_line)
        .map(|mut line| {
            match subtotal.checked_add(line.amount) {
                Some(sum) => subtotal = sum,
                None => {
                    warn!(description = %line.description, amount = %line.amount, "Invoice line overflows the subtotal");
                    line.unit_price = Decimal::ZERO;
                    line.amount = Decimal::ZERO;
                }
            }
            line
        })
        .collect()
}

fn normalize_line(item: &Map<String, Value>) -> InvoiceLine {
    let quantity = decimal(item, ITEM_QTY)
        .and_then(|q| q.trunc().to_u32())
        .or_else(|| {
            first(item, ITEM_SIZES).and_then(Value::as_object).map(|sizes| {
                sizes
                    .values()
                    .filter_map(parse_decimal)
                    .filter_map(|n| n.trunc().to_u32())
                    .fold(0u32, u32::saturating_add)
            })
        })
        .unwrap_or(0);
    let description = text(item, ITEM_NAME).unwrap_or_else(|| "Item".to_string());
    let unit_price = decimal(item, ITEM_PRICE).unwrap_or_default();
    let (unit_price, amount) = match unit_price.checked_mul(Decimal::from(quantity)) {
        Some(amount) => (unit_price, round_money(amount)),
        None => {
            warn!(%description, %unit_price, quantity, "Invoice line amount overflows, pricing it at zero");
            (Decimal::ZERO, Decimal::ZERO)
        }
    };
    InvoiceLine { description, quantity, unit_price, amount }
}

fn location_adjustment(invoice: &Map<String, Value>, taxable: Decimal) -> Option<LocationAdjustment> {
    let (percent, country) = match first(invoice, LOCATION_OBJECT).and_then(Value::as_object) {
        Some(nested) => (decimal(nested, LOCATION_PERCENT), text(nested, COUNTRY).or_else(|| text(invoice, COUNTRY))),
        None => (decimal(invoice, LOCATION_FLAT_PERCENT), text(invoice, COUNTRY)),
    };
    let percent = percent.unwrap_or_default();
    Some(LocationAdjustment { percent, country, amount: round_money(percent_of(taxable, percent)?) })
}

/// First non-null value among `keys`, in order.
fn first<'a>(obj: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a Value> {
    keys.iter().filter_map(|k| obj.get(*k)).find(|v| !v.is_null())
}

fn decimal(obj: &Map<String, Value>, keys: &[&str]) -> Option<Decimal> {
    keys.iter().filter_map(|k| obj.get(*k)).find_map(parse_decimal)
}

fn text(obj: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter().filter_map(|k| obj.get(*k)).find_map(|v| match v {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    })
}
