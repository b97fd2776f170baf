//! Report generation: statement exports (CSV/PDF), payment receipts and the balance
//! comparison report.
//!
//! All renderers take already-built data and return bytes; nothing here talks to the
//! HTTP layer.

use crate::{
    core::{
        payment::{PaymentFilter, PaymentView, list_payments},
        settings::{OrgSettings, get_current_balance},
        statement::Statement,
    },
    entities::{Expense, Payment, expense, payment},
    errors::{Error, Result},
};
use chrono::{Datelike, Months, NaiveDate, Utc};
use sea_orm::{QueryOrder, QuerySelect, prelude::*};
use serde::Serialize;
use std::{fmt::Write as _, str::FromStr};

/// Output format of a statement or report export.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ExportFormat {
    /// Comma-separated values, UTF-8
    #[default]
    Csv,
    /// Paginated A4 document
    Pdf,
}

impl ExportFormat {
    /// MIME type of the rendered document.
    #[must_use]
    pub const fn content_type(self) -> &'static str {
        match self {
            Self::Csv => "text/csv; charset=utf-8",
            Self::Pdf => "application/pdf",
        }
    }

    /// Download file name.
    #[must_use]
    pub const fn file_name(self) -> &'static str {
        match self {
            Self::Csv => "extrato.csv",
            Self::Pdf => "extrato.pdf",
        }
    }
}

impl FromStr for ExportFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "csv" => Ok(Self::Csv),
            "pdf" => Ok(Self::Pdf),
            other => Err(Error::validation(format!(
                "Unsupported export format '{other}' (expected csv or pdf)"
            ))),
        }
    }
}

/// Which rows a raw report export contains.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ReportKind {
    /// One row per payment, with the member's name
    #[default]
    Payments,
    /// One row per expense
    Expenses,
}

impl ReportKind {
    /// Download file name for `format`.
    #[must_use]
    pub fn file_name(self, format: ExportFormat) -> String {
        let extension = match format {
            ExportFormat::Csv => "csv",
            ExportFormat::Pdf => "pdf",
        };
        match self {
            Self::Payments => format!("relatorio-pagamentos.{extension}"),
            Self::Expenses => format!("relatorio-despesas.{extension}"),
        }
    }

    const fn title(self) -> &'static str {
        match self {
            Self::Payments => "Relatório de Pagamentos",
            Self::Expenses => "Relatório de Despesas",
        }
    }

    const fn headers(self) -> &'static [&'static str] {
        match self {
            Self::Payments => &["membro", "mes", "ano", "valor", "pago", "pago_em"],
            Self::Expenses => &["titulo", "valor", "data", "categoria", "observacoes"],
        }
    }

    const fn pdf_columns(self) -> &'static [f32] {
        match self {
            Self::Payments => &[40.0, 230.0, 270.0, 320.0, 420.0, 470.0],
            Self::Expenses => &[40.0, 230.0, 320.0, 390.0, 470.0],
        }
    }
}

impl FromStr for ReportKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "payments" => Ok(Self::Payments),
            "expenses" => Ok(Self::Expenses),
            other => Err(Error::validation(format!(
                "Unsupported report type '{other}' (expected payments or expenses)"
            ))),
        }
    }
}

/// Month/year window for report totals and exports. Absent parts do not filter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReportPeriod {
    /// Month, 1 to 12
    pub month: Option<i32>,
    /// Year
    pub year: Option<i32>,
}

impl ReportPeriod {
    /// Rejects months outside 1..=12.
    pub fn validated(self) -> Result<Self> {
        match self.month {
            Some(month) if !(1..=12).contains(&month) => Err(Error::InvalidMonth { month }),
            _ => Ok(self),
        }
    }

    /// Half-open `[start, end)` date range covered by the year (and month, if any).
    fn date_range(self) -> Result<Option<(NaiveDate, NaiveDate)>> {
        let Some(year) = self.year else {
            return Ok(None);
        };
        let (start, end) = match self.month {
            None => (
                NaiveDate::from_ymd_opt(year, 1, 1),
                year.checked_add(1).and_then(|next| NaiveDate::from_ymd_opt(next, 1, 1)),
            ),
            Some(month) => {
                let start = u32::try_from(month)
                    .ok()
                    .and_then(|month| NaiveDate::from_ymd_opt(year, month, 1));
                (start, start.and_then(|start| start.checked_add_months(Months::new(1))))
            }
        };
        start
            .zip(end)
            .map(Some)
            .ok_or_else(|| Error::validation(format!("Year {year} is out of range")))
    }

    /// Month-only filter, applied in memory when no year narrows the range.
    fn matches_month(self, date: NaiveDate) -> bool {
        self.month
            .is_none_or(|month| u32::try_from(month).is_ok_and(|month| date.month() == month))
    }
}

/// Sum of paid payment amounts in `period`.
pub async fn paid_total<C>(db: &C, period: ReportPeriod) -> Result<f64>
where
    C: ConnectionTrait,
{
    let mut query = Payment::find()
        .select_only()
        .column_as(payment::Column::Amount.sum(), "total")
        .filter(payment::Column::Paid.eq(true));
    if let Some(month) = period.month {
        query = query.filter(payment::Column::Month.eq(month));
    }
    if let Some(year) = period.year {
        query = query.filter(payment::Column::Year.eq(year));
    }
    Ok(query
        .into_tuple::<Option<f64>>()
        .one(db)
        .await?
        .flatten()
        .unwrap_or(0.0))
}

/// Sum of expense amounts dated within `year`, or of all expenses.
async fn expense_total<C>(db: &C, year: Option<i32>) -> Result<f64>
where
    C: ConnectionTrait,
{
    let mut query = Expense::find()
        .select_only()
        .column_as(expense::Column::Amount.sum(), "total");
    if let Some((start, end)) = (ReportPeriod { month: None, year }).date_range()? {
        query = query
            .filter(expense::Column::ExpenseDate.gte(start))
            .filter(expense::Column::ExpenseDate.lt(end));
    }
    Ok(query
        .into_tuple::<Option<f64>>()
        .one(db)
        .await?
        .flatten()
        .unwrap_or(0.0))
}

/// Side-by-side view of the two balance figures.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BalanceReport {
    /// Year the totals are restricted to, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub year: Option<i32>,
    /// Sum of paid payments
    pub total_payments: f64,
    /// Sum of expenses
    pub total_expenses: f64,
    /// `total_payments - total_expenses`
    pub balance: f64,
    /// The stored scalar balance, never filtered by year
    pub current_balance: f64,
}

/// Computes the balance comparison report, optionally for a single year.
pub async fn balance_report<C>(db: &C, year: Option<i32>) -> Result<BalanceReport>
where
    C: ConnectionTrait,
{
    let total_payments = paid_total(db, ReportPeriod { month: None, year }).await?;
    let total_expenses = expense_total(db, year).await?;
    let current_balance = get_current_balance(db).await?;
    Ok(BalanceReport {
        year,
        total_payments,
        total_expenses,
        balance: total_payments - total_expenses,
        current_balance,
    })
}

/// Raw payment or expense rows, already formatted as text cells.
#[derive(Debug, Clone, PartialEq)]
pub struct ReportTable {
    /// Row source
    pub kind: ReportKind,
    /// One entry per row, in header order
    pub rows: Vec<Vec<String>>,
}

/// Loads the rows of a raw report export.
pub async fn report_rows(
    db: &DatabaseConnection,
    kind: ReportKind,
    period: ReportPeriod,
) -> Result<ReportTable> {
    let period = period.validated()?;
    let rows = match kind {
        ReportKind::Payments => {
            let filter = PaymentFilter {
                month: period.month,
                year: period.year,
                member_id: None,
            };
            list_payments(db, filter)
                .await?
                .into_iter()
                .map(|view| {
                    let payment = view.payment;
                    vec![
                        view.member_name,
                        format!("{:02}", payment.month),
                        payment.year.to_string(),
                        format!("{:.2}", payment.amount),
                        if payment.paid { "sim" } else { "não" }.to_string(),
                        payment.paid_at.map(format_date_br).unwrap_or_default(),
                    ]
                })
                .collect()
        }
        ReportKind::Expenses => {
            let mut query = Expense::find();
            if let Some((start, end)) = period.date_range()? {
                query = query
                    .filter(expense::Column::ExpenseDate.gte(start))
                    .filter(expense::Column::ExpenseDate.lt(end));
            }
            query
                .order_by_asc(expense::Column::ExpenseDate)
                .order_by_asc(expense::Column::Id)
                .all(db)
                .await?
                .into_iter()
                .filter(|expense| period.matches_month(expense.expense_date))
                .map(|expense| {
                    vec![
                        expense.title,
                        format!("{:.2}", expense.amount),
                        format_date_br(expense.expense_date),
                        expense.category.unwrap_or_default(),
                        expense.notes.unwrap_or_default(),
                    ]
                })
                .collect()
        }
    };
    Ok(ReportTable { kind, rows })
}

/// Renders raw report rows in the requested format.
pub fn export_report(
    table: &ReportTable,
    format: ExportFormat,
    org: &OrgSettings,
) -> Result<Vec<u8>> {
    match format {
        ExportFormat::Csv => report_csv(table),
        ExportFormat::Pdf => Ok(report_pdf(table, org)),
    }
}

fn report_csv(table: &ReportTable) -> Result<Vec<u8>> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(table.kind.headers())?;
    for row in &table.rows {
        writer.write_record(row)?;
    }
    writer
        .into_inner()
        .map_err(|e| Error::Io(e.into_error()))
}

fn report_pdf(table: &ReportTable, org: &OrgSettings) -> Vec<u8> {
    let columns = table.kind.pdf_columns();

    let mut doc = PdfDocument::new();
    doc.text(Font::Bold, 18.0, table.kind.title());
    doc.text(Font::Regular, 10.0, &org.org_name);
    doc.text(Font::Regular, 10.0, &format!("{} registros", table.rows.len()));
    doc.gap(10.0);

    doc.table_header(
        8.0,
        columns
            .iter()
            .zip(table.kind.headers())
            .map(|(x, label)| (*x, label.to_uppercase()))
            .collect(),
    );
    for row in &table.rows {
        let cells = columns
            .iter()
            .zip(row)
            .map(|(x, cell)| (*x, truncate_cell(cell)))
            .collect::<Vec<_>>();
        doc.row(Font::Regular, 8.0, &cells);
    }
    doc.end_table();

    if !org.document_footer.is_empty() {
        doc.gap(20.0);
        doc.text(Font::Regular, 9.0, &org.document_footer);
    }
    doc.render()
}

/// `DD/MM/YYYY`.
#[must_use]
pub fn format_date_br(date: NaiveDate) -> String {
    date.format("%d/%m/%Y").to_string()
}

/// Brazilian currency format, e.g. `R$ 1.234,56` and `-R$ 0,50`.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn format_brl(value: f64) -> String {
    let value = if value.is_finite() { value } else { 0.0 };
    let total_cents = (value.abs() * 100.0).round() as u64;
    let (units, cents) = (total_cents / 100, total_cents % 100);

    let digits = units.to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (index, digit) in digits.chars().enumerate() {
        if index > 0 && (digits.len() - index) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(digit);
    }

    let sign = if value < 0.0 && total_cents > 0 { "-" } else { "" };
    format!("{sign}R$ {grouped},{cents:02}")
}

const MONTH_NAMES: [&str; 12] = [
    "Janeiro",
    "Fevereiro",
    "Março",
    "Abril",
    "Maio",
    "Junho",
    "Julho",
    "Agosto",
    "Setembro",
    "Outubro",
    "Novembro",
    "Dezembro",
];

/// `Março/2024` style competency label; unknown months fall back to the number.
#[must_use]
pub fn competency_label(month: i32, year: i32) -> String {
    usize::try_from(month - 1)
        .ok()
        .and_then(|index| MONTH_NAMES.get(index))
        .map_or_else(|| format!("{month}/{year}"), |name| format!("{name}/{year}"))
}

/// Renders the statement in the requested format.
pub fn export_statement(
    statement: &Statement,
    format: ExportFormat,
    org: &OrgSettings,
) -> Result<Vec<u8>> {
    match format {
        ExportFormat::Csv => statement_csv(statement),
        ExportFormat::Pdf => Ok(statement_pdf(statement, org)),
    }
}

/// CSV with header `data,tipo,descricao,valor,saldo_acumulado,observacoes`.
pub fn statement_csv(statement: &Statement) -> Result<Vec<u8>> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record([
        "data",
        "tipo",
        "descricao",
        "valor",
        "saldo_acumulado",
        "observacoes",
    ])?;
    for entry in &statement.entries {
        writer.write_record([
            format_date_br(entry.date),
            entry.entry_type.label().to_string(),
            entry.description.clone(),
            format!("{:.2}", entry.amount),
            format!("{:.2}", entry.running_balance),
            entry.notes.clone(),
        ])?;
    }
    writer
        .into_inner()
        .map_err(|e| Error::Io(e.into_error()))
}

fn truncate_cell(text: &str) -> String {
    if text.chars().count() > 35 {
        let head: String = text.chars().take(32).collect();
        format!("{head}...")
    } else {
        text.to_string()
    }
}

/// Statement as a paginated A4 table.
#[must_use]
pub fn statement_pdf(statement: &Statement, org: &OrgSettings) -> Vec<u8> {
    const COLUMNS: [f32; 5] = [40.0, 110.0, 180.0, 380.0, 465.0];

    let mut doc = PdfDocument::new();
    doc.text(Font::Bold, 18.0, "Extrato de Movimentações");
    doc.text(Font::Regular, 10.0, &org.org_name);
    if !org.org_tagline.is_empty() {
        doc.text(Font::Regular, 10.0, &org.org_tagline);
    }
    doc.text(Font::Regular, 10.0, "Documento gerado automaticamente");
    doc.gap(10.0);

    let summary = &statement.summary;
    doc.row(
        Font::Bold,
        10.0,
        &[
            (40.0, format!("TOTAL ENTRADAS: {}", format_brl(summary.total_income))),
            (220.0, format!("TOTAL SAÍDAS: {}", format_brl(summary.total_expense))),
            (400.0, format!("SALDO LÍQUIDO: {}", format_brl(summary.net_balance))),
        ],
    );
    doc.gap(10.0);

    let header = ["Data", "Tipo", "Descrição", "Valor", "Saldo"];
    doc.table_header(
        8.0,
        COLUMNS
            .iter()
            .zip(header)
            .map(|(x, label)| (*x, label.to_string()))
            .collect(),
    );
    for entry in &statement.entries {
        let cells = [
            format_date_br(entry.date),
            entry.entry_type.label().to_string(),
            truncate_cell(&entry.description),
            format_brl(entry.amount),
            format_brl(entry.running_balance),
        ];
        doc.row(
            Font::Regular,
            8.0,
            &COLUMNS.iter().copied().zip(cells).collect::<Vec<_>>(),
        );
    }
    doc.end_table();

    if !org.document_footer.is_empty() {
        doc.gap(20.0);
        doc.text(Font::Regular, 9.0, &org.document_footer);
    }
    doc.render()
}

/// One-page receipt for a payment.
#[must_use]
pub fn receipt_pdf(view: &PaymentView, member_email: Option<&str>, org: &OrgSettings) -> Vec<u8> {
    let payment = &view.payment;
    let paid_at = payment
        .paid_at
        .map_or_else(|| "não informado".to_string(), format_date_br);

    let mut doc = PdfDocument::new();
    doc.text(Font::Bold, 20.0, "Recibo de Pagamento");
    doc.text(Font::Regular, 10.0, &org.org_name);
    doc.text(Font::Regular, 10.0, "Documento gerado automaticamente");
    doc.gap(16.0);

    let fields = [
        ("Membro", view.member_name.clone()),
        ("Email", member_email.unwrap_or("não informado").to_string()),
        ("Recibo", format!("#{}", payment.id)),
        ("Competência", competency_label(payment.month, payment.year)),
        ("Pagamento em", paid_at),
        (
            "Status",
            if payment.paid { "Pago" } else { "Pendente" }.to_string(),
        ),
    ];
    for (label, value) in fields {
        doc.row(
            Font::Regular,
            11.0,
            &[(40.0, label.to_uppercase()), (180.0, value)],
        );
    }
    doc.gap(12.0);
    doc.text(Font::Bold, 12.0, "Valor recebido");
    doc.text(Font::Bold, 22.0, &format_brl(payment.amount));
    doc.text(
        Font::Regular,
        10.0,
        &format!("Emitido em {}", format_date_br(Utc::now().date_naive())),
    );

    if let Some(notes) = payment.notes.as_deref().filter(|n| !n.is_empty()) {
        doc.gap(12.0);
        doc.text(Font::Bold, 11.0, "Observações");
        doc.text(Font::Regular, 10.0, notes);
    }
    if !org.document_footer.is_empty() {
        doc.gap(24.0);
        doc.text(Font::Regular, 9.0, &org.document_footer);
    }
    doc.render()
}

/// The two standard fonts a [`PdfDocument`] uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Font {
    Regular,
    Bold,
}

impl Font {
    const fn resource(self) -> &'static str {
        match self {
            Self::Regular => "F1",
            Self::Bold => "F2",
        }
    }
}

const PAGE_WIDTH: f32 = 595.0;
const PAGE_HEIGHT: f32 = 842.0;
const MARGIN: f32 = 40.0;

/// Minimal text-only PDF 1.4 writer: A4 pages, Helvetica in WinAnsi encoding,
/// automatic page breaks that repeat the open table header.
struct PdfDocument {
    pages: Vec<Vec<u8>>,
    current: Vec<u8>,
    cursor_y: f32,
    table_header: Option<(f32, Vec<(f32, String)>)>,
}

impl PdfDocument {
    fn new() -> Self {
        Self {
            pages: Vec::new(),
            current: Vec::new(),
            cursor_y: PAGE_HEIGHT - MARGIN,
            table_header: None,
        }
    }

    fn gap(&mut self, height: f32) {
        self.cursor_y -= height;
    }

    /// Writes a paragraph, wrapped to the printable width.
    fn text(&mut self, font: Font, size: f32, text: &str) {
        for line in wrap_text(text, max_line_chars(size)) {
            self.row(font, size, &[(MARGIN, line)]);
        }
    }

    /// Writes a bold header row and repeats it at the top of every following page
    /// until [`PdfDocument::end_table`].
    fn table_header(&mut self, size: f32, cells: Vec<(f32, String)>) {
        self.row(Font::Bold, size, &cells);
        self.table_header = Some((size, cells));
    }

    fn end_table(&mut self) {
        self.table_header = None;
    }

    /// Writes one line with each cell at its own x offset.
    fn row(&mut self, font: Font, size: f32, cells: &[(f32, String)]) {
        if self.cursor_y - size * 1.5 < MARGIN {
            self.break_page();
        }
        self.write_line(font, size, cells);
    }

    fn break_page(&mut self) {
        self.pages.push(std::mem::take(&mut self.current));
        self.cursor_y = PAGE_HEIGHT - MARGIN;
        if let Some((size, cells)) = self.table_header.take() {
            self.write_line(Font::Bold, size, &cells);
            self.table_header = Some((size, cells));
        }
    }

    fn write_line(&mut self, font: Font, size: f32, cells: &[(f32, String)]) {
        self.cursor_y -= size * 1.5;
        for (x, text) in cells {
            self.current.extend_from_slice(
                format!(
                    "BT /{} {size:.1} Tf {x:.1} {:.1} Td (",
                    font.resource(),
                    self.cursor_y
                )
                .as_bytes(),
            );
            self.current.extend(encode_pdf_text(text));
            self.current.extend_from_slice(b") Tj ET\n");
        }
    }

    fn render(mut self) -> Vec<u8> {
        if !self.current.is_empty() || self.pages.is_empty() {
            self.pages.push(std::mem::take(&mut self.current));
        }

        // Object numbers: 1 catalog, 2 page tree, 3-4 fonts, then (page, content) pairs
        let page_count = self.pages.len();
        let kids = (0..page_count)
            .map(|index| format!("{} 0 R", 5 + index * 2))
            .collect::<Vec<_>>()
            .join(" ");

        let mut objects: Vec<Vec<u8>> = vec![
            b"<< /Type /Catalog /Pages 2 0 R >>".to_vec(),
            format!("<< /Type /Pages /Kids [{kids}] /Count {page_count} >>").into_bytes(),
            b"<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica /Encoding /WinAnsiEncoding >>"
                .to_vec(),
            b"<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica-Bold /Encoding /WinAnsiEncoding >>"
                .to_vec(),
        ];
        for (index, content) in self.pages.iter().enumerate() {
            let content_id = 6 + index * 2;
            objects.push(
                format!(
                    "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 {PAGE_WIDTH} {PAGE_HEIGHT}] \
                     /Resources << /Font << /F1 3 0 R /F2 4 0 R >> >> /Contents {content_id} 0 R >>"
                )
                .into_bytes(),
            );
            let mut stream = format!("<< /Length {} >>\nstream\n", content.len()).into_bytes();
            stream.extend_from_slice(content);
            stream.extend_from_slice(b"\nendstream");
            objects.push(stream);
        }

        let mut out = b"%PDF-1.4\n".to_vec();
        let mut offsets = Vec::with_capacity(objects.len());
        for (index, body) in objects.iter().enumerate() {
            offsets.push(out.len());
            out.extend_from_slice(format!("{} 0 obj\n", index + 1).as_bytes());
            out.extend_from_slice(body);
            out.extend_from_slice(b"\nendobj\n");
        }

        let xref_start = out.len();
        let mut xref = format!("xref\n0 {}\n0000000000 65535 f \n", objects.len() + 1);
        for offset in offsets {
            let _ = writeln!(xref, "{offset:010} 00000 n ");
        }
        let _ = write!(
            xref,
            "trailer\n<< /Size {} /Root 1 0 R >>\nstartxref\n{xref_start}\n%%EOF\n",
            objects.len() + 1
        );
        out.extend_from_slice(xref.as_bytes());
        out
    }
}

/// Characters that fit the printable width at `size`, assuming Helvetica's average
/// glyph width of about half the font size.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn max_line_chars(size: f32) -> usize {
    ((PAGE_WIDTH - 2.0 * MARGIN) / (size * 0.5)).max(1.0) as usize
}

/// Greedy word wrap; words longer than a line are split.
fn wrap_text(text: &str, max_chars: usize) -> Vec<String> {
    let mut lines = Vec::new();
    let mut line = String::new();
    for word in text.split_whitespace() {
        let mut word: Vec<char> = word.chars().collect();
        while word.len() > max_chars {
            if !line.is_empty() {
                lines.push(std::mem::take(&mut line));
            }
            let rest = word.split_off(max_chars);
            lines.push(word.into_iter().collect());
            word = rest;
        }
        let line_len = line.chars().count();
        if line_len > 0 && line_len + 1 + word.len() > max_chars {
            lines.push(std::mem::take(&mut line));
        }
        if !line.is_empty() {
            line.push(' ');
        }
        line.extend(word);
    }
    if !line.is_empty() || lines.is_empty() {
        lines.push(line);
    }
    lines
}

/// Escapes a string for a PDF literal in WinAnsi encoding. Characters outside
/// Latin-1 become `?`.
fn encode_pdf_text(text: &str) -> Vec<u8> {
    let mut out = Vec::with_capacity(text.len());
    for ch in text.chars() {
        let byte = u8::try_from(u32::from(ch)).unwrap_or(b'?');
        match byte {
            b'(' | b')' | b'\\' => {
                out.push(b'\\');
                out.push(byte);
            }
            0x20..=0x7E => out.push(byte),
            _ => out.extend_from_slice(format!("\\{byte:03o}").as_bytes()),
        }
    }
    out
}
