//! Printable invoice export
//!
//! Renders a [`NormalizedInvoice`] to a single A4 PDF page: line items, the
//! totals breakdown and a QR code carrying the invoice number.

use printpdf::{BuiltinFont, IndirectFontRef, Mm, PdfDocument, PdfLayerReference, Rect};
use qrcode::{Color, QrCode};
use rust_decimal::Decimal;

use crate::domain::services::invoice::NormalizedInvoice;
use crate::{Result, StorefrontError};

const PAGE_WIDTH: f32 = 210.0;
const PAGE_HEIGHT: f32 = 297.0;
const QR_SIZE: f32 = 32.0;
const BOTTOM_MARGIN: f32 = 60.0;

pub struct InvoiceDocument<'a> {
    invoice: &'a NormalizedInvoice,
}

impl<'a> InvoiceDocument<'a> {
    pub fn new(invoice: &'a NormalizedInvoice) -> Self { Self { invoice } }

    /// `invoice-<orderId>.pdf`, with anything unsafe in a file name dropped.
    pub fn file_name(&self) -> String {
        let id: String = self.invoice.order_id.chars().filter(|c| c.is_ascii_alphanumeric() || *c == '-' || *c == '_').collect();
        format!("invoice-{id}.pdf")
    }

    /// Label/amount rows of the totals block, in print order.
    pub fn totals_rows(&self) -> Vec<(String, String)> {
        let t = &self.invoice.totals;
        let mut rows = vec![
            ("Subtotal".to_string(), self.money(t.subtotal)),
            ("Packaging".to_string(), self.money(t.packaging_charge)),
            ("Printing".to_string(), self.money(t.printing_charge)),
            (format!("CGST ({}%)", t.tax.cgst_rate.normalize()), self.money(t.tax.cgst_amount)),
            (format!("SGST ({}%)", t.tax.sgst_rate.normalize()), self.money(t.tax.sgst_amount)),
        ];
        if !t.location_adjustment.amount.is_zero() {
            let label = match &t.location_adjustment.country {
                Some(country) => format!("Location adjustment {country} ({}%)", t.location_adjustment.percent.normalize()),
                None => format!("Location adjustment ({}%)", t.location_adjustment.percent.normalize()),
            };
            rows.push((label, self.money(t.location_adjustment.amount)));
        }
        if !t.balance_adjustment.is_zero() {
            rows.push(("Adjustment".to_string(), self.money(t.balance_adjustment)));
        }
        rows.push(("Grand total".to_string(), self.money(t.grand_total)));
        rows
    }

    fn money(&self, amount: Decimal) -> String {
        format!("{} {:.2}", self.invoice.currency, amount)
    }

    /// Square module grid of the invoice-number QR code, row-major, `true` = dark.
    pub fn qr_modules(&self) -> Result<(usize, Vec<bool>)> {
        let code = QrCode::new(self.invoice.invoice_number.as_bytes()).map_err(|e| StorefrontError::Pdf(e.to_string()))?;
        let width = code.width();
        let modules = code.to_colors().into_iter().map(|c| c == Color::Dark).collect();
        Ok((width, modules))
    }

    pub fn render_pdf(&self) -> Result<Vec<u8>> {
        let title = format!("Invoice {}", self.invoice.invoice_number);
        let (doc, page, layer) = PdfDocument::new(&title, Mm(PAGE_WIDTH), Mm(PAGE_HEIGHT), "Layer 1");
        let layer = doc.get_page(page).get_layer(layer);
        let font = doc.add_builtin_font(BuiltinFont::Helvetica).map_err(|e| StorefrontError::Pdf(e.to_string()))?;
        let bold = doc.add_builtin_font(BuiltinFont::HelveticaBold).map_err(|e| StorefrontError::Pdf(e.to_string()))?;

        let mut y = 280.0;
        text(&layer, &bold, "INVOICE", 22.0, 15.0, y);
        y -= 9.0;
        text(&layer, &font, &format!("Invoice no: {}", self.invoice.invoice_number), 10.0, 15.0, y);
        y -= 5.0;
        text(&layer, &font, &format!("Order: {}", self.invoice.order_id), 10.0, 15.0, y);
        if let Some(issued) = &self.invoice.issued_at {
            y -= 5.0;
            text(&layer, &font, &format!("Date: {issued}"), 10.0, 15.0, y);
        }
        self.draw_qr(&layer, PAGE_WIDTH - 15.0 - QR_SIZE, 250.0)?;

        y = 240.0;
        let (x_desc, x_qty, x_unit, x_total) = (15.0, 115.0, 140.0, 170.0);
        text(&layer, &bold, "Item", 10.0, x_desc, y);
        text(&layer, &bold, "Qty", 10.0, x_qty, y);
        text(&layer, &bold, "Price", 10.0, x_unit, y);
        text(&layer, &bold, "Amount", 10.0, x_total, y);
        y -= 7.0;
        for line in &self.invoice.lines {
            if y < BOTTOM_MARGIN {
                return Err(StorefrontError::Pdf("too many invoice lines for one page".into()));
            }
            text(&layer, &font, &line.description, 10.0, x_desc, y);
            text(&layer, &font, &line.quantity.to_string(), 10.0, x_qty, y);
            text(&layer, &font, &format!("{:.2}", line.unit_price), 10.0, x_unit, y);
            text(&layer, &font, &format!("{:.2}", line.amount), 10.0, x_total, y);
            y -= 6.0;
        }

        y -= 6.0;
        let rows = self.totals_rows();
        let last = rows.len().saturating_sub(1);
        for (idx, (label, amount)) in rows.iter().enumerate() {
            let face = if idx == last { &bold } else { &font };
            text(&layer, face, label, 10.0, 110.0, y);
            text(&layer, face, amount, 10.0, 165.0, y);
            y -= 6.0;
        }

        let mut writer = std::io::BufWriter::new(Vec::<u8>::new());
        doc.save(&mut writer).map_err(|e| StorefrontError::Pdf(e.to_string()))?;
        writer.into_inner().map_err(|e| StorefrontError::Pdf(e.to_string()))
    }

    fn draw_qr(&self, layer: &PdfLayerReference, x: f32, y: f32) -> Result<()> {
        let (width, modules) = self.qr_modules()?;
        let cell = QR_SIZE / width as f32;
        for (idx, _) in modules.iter().enumerate().filter(|(_, dark)| **dark) {
            let (col, row) = ((idx % width) as f32, (idx / width) as f32);
            let left = x + col * cell;
            let top = y + QR_SIZE - row * cell;
            layer.add_rect(Rect::new(Mm(left), Mm(top - cell), Mm(left + cell), Mm(top)));
        }
        Ok(())
    }
}

fn text(layer: &PdfLayerReference, font: &IndirectFontRef, value: &str, size: f32, x: f32, y: f32) {
    layer.use_text(value, size, Mm(x), Mm(y), font);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::services::InvoiceNormalizer;
    use serde_json::json;

    fn invoice() -> NormalizedInvoice {
        let raw = json!({
            "invoiceNumber": "INV-77",
            "items": [{ "name": "Crew tee", "quantity": 2, "price": 510 }],
            "locationAdjustment": { "percent": 5, "country": "US" }
        });
        InvoiceNormalizer::default().normalize(Some("ord/77"), Some(&raw)).unwrap()
    }

    #[test]
    fn test_file_name() {
        let invoice = invoice();
        assert_eq!(InvoiceDocument::new(&invoice).file_name(), "invoice-ord77.pdf");
    }

    #[test]
    fn test_totals_rows() {
        let invoice = invoice();
        let rows = InvoiceDocument::new(&invoice).totals_rows();
        assert_eq!(rows[0], ("Subtotal".to_string(), "INR 1020.00".to_string()));
        assert_eq!(rows[3].0, "CGST (9%)");
        assert!(rows.iter().any(|(label, _)| label == "Location adjustment US (5%)"));
        assert_eq!(rows.last().map(|(l, _)| l.as_str()), Some("Grand total"));
    }

    #[test]
    fn test_qr_is_square() {
        let invoice = invoice();
        let (width, modules) = InvoiceDocument::new(&invoice).qr_modules().unwrap();
        assert_eq!(modules.len(), width * width);
        assert!(modules.iter().any(|dark| *dark));
    }

    #[test]
    fn test_render_pdf() {
        let invoice = invoice();
        let bytes = InvoiceDocument::new(&invoice).render_pdf().unwrap();
        assert!(bytes.starts_with(b"%PDF"));
    }
}
