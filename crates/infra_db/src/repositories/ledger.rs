//! Ledger repository implementation
//!
//! SQL for items, documents, lines and balances. Plain reads go through the
//! pool; the locking reads and staged writes of a posting are free functions
//! over a connection so they run inside the caller's transaction.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{PgConnection, PgExecutor, PgPool};
use uuid::Uuid;

use core_kernel::{CounterpartyId, DocumentId, Money, NomenclatureId, Rate};
use domain_inventory::{Document, DocumentLine, InboundBatch, InventoryBalance, Nomenclature, PostedLine};

use crate::error::DatabaseError;

/// Repository for the inventory ledger tables
#[derive(Debug, Clone)]
pub struct LedgerRepository {
    pool: PgPool,
}

impl LedgerRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Inserts an item or renames an existing one
    pub async fn upsert_item(&self, item: &Nomenclature) -> Result<(), DatabaseError> {
        sqlx::query(
            r#"
            INSERT INTO nomenclature (id, name, vat_rate)
            VALUES ($1, $2, $3)
            ON CONFLICT (id) DO UPDATE SET name = EXCLUDED.name, vat_rate = EXCLUDED.vat_rate
            "#,
        )
        .bind(item.id.as_uuid())
        .bind(&item.name)
        .bind(item.vat_rate.map(|r| r.as_decimal()))
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn get_item(&self, id: NomenclatureId) -> Result<Option<Nomenclature>, DatabaseError> {
        let row = sqlx::query_as::<_, NomenclatureRow>("SELECT id, name, vat_rate FROM nomenclature WHERE id = $1")
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(NomenclatureRow::into_domain))
    }

    /// Stores a document header and its lines in a single transaction
    pub async fn insert_document(&self, document: &Document) -> Result<(), DatabaseError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO documents (
                id, document_date, operation_type, is_posted, counterparty_id,
                contract_name, currency, total_amount, last_updated
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(document.id.as_uuid())
        .bind(document.document_date)
        .bind(&document.operation_type)
        .bind(document.is_posted)
        .bind(document.counterparty_id.map(Uuid::from))
        .bind(&document.contract_name)
        .bind(&document.currency)
        .bind(document.total_amount.amount())
        .bind(document.last_updated)
        .execute(&mut *tx)
        .await?;

        for line in &document.lines {
            sqlx::query(
                r#"
                INSERT INTO document_lines (
                    id, document_id, line_no, nomenclature_id, account, quantity, unit,
                    price_with_vat, total_with_vat, vat_amount, total_amount, total_cost
                ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
                "#,
            )
            .bind(line.id.as_uuid())
            .bind(document.id.as_uuid())
            .bind(line.line_no)
            .bind(line.nomenclature_id.as_uuid())
            .bind(&line.account)
            .bind(line.quantity)
            .bind(&line.unit)
            .bind(line.price_with_vat.amount())
            .bind(line.total_with_vat.amount())
            .bind(line.vat_amount.amount())
            .bind(line.total_amount.amount())
            .bind(line.total_cost.map(|c| c.amount()))
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    pub async fn get_document(&self, id: DocumentId) -> Result<Option<Document>, DatabaseError> {
        let mut conn = self.pool.acquire().await?;
        fetch_document(&mut conn, id, false).await
    }

    /// All documents with their lines, in posting order
    pub async fn list_documents(&self) -> Result<Vec<Document>, DatabaseError> {
        let headers = sqlx::query_as::<_, DocumentRow>(&format!(
            "SELECT {} FROM documents ORDER BY document_date, id",
            DOCUMENT_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?;

        let lines = sqlx::query_as::<_, LineRow>(&format!(
            "SELECT {} FROM document_lines l JOIN nomenclature n ON n.id = l.nomenclature_id ORDER BY l.document_id, l.line_no",
            LINE_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?;

        let mut by_document: HashMap<Uuid, Vec<DocumentLine>> = HashMap::new();
        for line in lines {
            by_document.entry(line.document_id).or_default().push(line.into_domain());
        }

        Ok(headers
            .into_iter()
            .map(|header| {
                let lines = by_document.remove(&header.id).unwrap_or_default();
                header.into_domain(lines)
            })
            .collect())
    }

    pub async fn get_balance(
        &self,
        item: NomenclatureId,
        account: &str,
    ) -> Result<Option<InventoryBalance>, DatabaseError> {
        let row = sqlx::query_as::<_, BalanceRow>(&format!(
            "SELECT {} FROM inventory_balances WHERE nomenclature_id = $1 AND account = $2",
            BALANCE_COLUMNS
        ))
        .bind(item.as_uuid())
        .bind(account)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(BalanceRow::into_domain))
    }

    pub async fn list_balances(&self) -> Result<Vec<InventoryBalance>, DatabaseError> {
        let rows = sqlx::query_as::<_, BalanceRow>(&format!(
            "SELECT {} FROM inventory_balances ORDER BY nomenclature_id, account",
            BALANCE_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(BalanceRow::into_domain).collect())
    }

    /// Lines of posted documents dated at or before `until`, in posting order
    pub async fn posted_lines_until(&self, until: DateTime<Utc>) -> Result<Vec<PostedLine>, DatabaseError> {
        let rows = sqlx::query_as::<_, PostedLineRow>(&format!(
            "{} WHERE d.is_posted AND d.document_date <= $1 {}",
            posted_lines_select(),
            POSTING_ORDER
        ))
        .bind(until)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(PostedLineRow::into_domain).collect())
    }

    /// Lines of posted documents of `operation_types` dated within
    /// `from..=to`, in posting order
    pub async fn posted_lines_between(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
        operation_types: &[String],
    ) -> Result<Vec<PostedLine>, DatabaseError> {
        let rows = sqlx::query_as::<_, PostedLineRow>(&format!(
            "{} WHERE d.is_posted AND d.document_date BETWEEN $1 AND $2 AND d.operation_type = ANY($3) {}",
            posted_lines_select(),
            POSTING_ORDER
        ))
        .bind(from)
        .bind(to)
        .bind(operation_types)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(PostedLineRow::into_domain).collect())
    }
}

// ============================================================================
// Transactional statements
// ============================================================================

/// Reads a document and its lines, taking a row lock on the header
pub async fn load_document_for_update(
    conn: &mut PgConnection,
    id: DocumentId,
) -> Result<Option<Document>, DatabaseError> {
    fetch_document(conn, id, true).await
}

/// Locks the item row; fails if the item does not exist
pub async fn lock_item(conn: &mut PgConnection, item: NomenclatureId) -> Result<(), DatabaseError> {
    sqlx::query_scalar::<_, Uuid>("SELECT id FROM nomenclature WHERE id = $1 FOR UPDATE")
        .bind(item.as_uuid())
        .fetch_optional(conn)
        .await?
        .map(|_| ())
        .ok_or_else(|| DatabaseError::not_found("Nomenclature", item))
}

pub async fn balance_for_update(
    conn: &mut PgConnection,
    item: NomenclatureId,
    account: &str,
) -> Result<Option<InventoryBalance>, DatabaseError> {
    let row = sqlx::query_as::<_, BalanceRow>(&format!(
        "SELECT {} FROM inventory_balances WHERE nomenclature_id = $1 AND account = $2 FOR UPDATE",
        BALANCE_COLUMNS
    ))
    .bind(item.as_uuid())
    .bind(account)
    .fetch_optional(conn)
    .await?;
    Ok(row.map(BalanceRow::into_domain))
}

pub async fn insert_balance(conn: &mut PgConnection, balance: &InventoryBalance) -> Result<(), DatabaseError> {
    sqlx::query(
        r#"
        INSERT INTO inventory_balances (nomenclature_id, account, quantity, total_amount, last_updated)
        VALUES ($1, $2, $3, $4, $5)
        "#,
    )
    .bind(balance.nomenclature_id.as_uuid())
    .bind(&balance.account)
    .bind(balance.quantity)
    .bind(balance.total_amount.amount())
    .bind(balance.last_updated)
    .execute(conn)
    .await?;
    Ok(())
}

pub async fn update_balance(conn: &mut PgConnection, balance: &InventoryBalance) -> Result<(), DatabaseError> {
    let result = sqlx::query(
        r#"
        UPDATE inventory_balances
        SET quantity = $3, total_amount = $4, last_updated = $5
        WHERE nomenclature_id = $1 AND account = $2
        "#,
    )
    .bind(balance.nomenclature_id.as_uuid())
    .bind(&balance.account)
    .bind(balance.quantity)
    .bind(balance.total_amount.amount())
    .bind(balance.last_updated)
    .execute(conn)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DatabaseError::not_found(
            "InventoryBalance",
            format!("{}/{}", balance.nomenclature_id, balance.account),
        ));
    }
    Ok(())
}

/// Quantity of `item` withdrawn by posted documents of `outbound_types`
/// strictly before `(date, id)` in posting order
pub async fn outbound_quantity_before(
    conn: &mut PgConnection,
    item: NomenclatureId,
    date: DateTime<Utc>,
    id: DocumentId,
    outbound_types: &[String],
) -> Result<Decimal, DatabaseError> {
    let quantity = sqlx::query_scalar::<_, Decimal>(
        r#"
        SELECT COALESCE(SUM(l.quantity), 0)
        FROM document_lines l
        JOIN documents d ON d.id = l.document_id
        WHERE l.nomenclature_id = $1
          AND d.is_posted
          AND d.operation_type = ANY($2)
          AND (d.document_date, d.id) < ($3, $4)
        "#,
    )
    .bind(item.as_uuid())
    .bind(outbound_types)
    .bind(date)
    .bind(id.as_uuid())
    .fetch_one(conn)
    .await?;
    Ok(quantity)
}

/// Posted lines of `item` from documents of `inbound_types`, oldest first
pub async fn inbound_batches(
    conn: &mut PgConnection,
    item: NomenclatureId,
    inbound_types: &[String],
) -> Result<Vec<InboundBatch>, DatabaseError> {
    let rows = sqlx::query_as::<_, BatchRow>(
        r#"
        SELECT d.id AS document_id, d.document_date, l.id AS line_id, l.quantity, l.total_amount
        FROM document_lines l
        JOIN documents d ON d.id = l.document_id
        WHERE l.nomenclature_id = $1
          AND d.is_posted
          AND d.operation_type = ANY($2)
        ORDER BY d.document_date, d.id, l.line_no
        "#,
    )
    .bind(item.as_uuid())
    .bind(inbound_types)
    .fetch_all(conn)
    .await?;

    Ok(rows
        .into_iter()
        .map(|row| InboundBatch {
            document_id: row.document_id.into(),
            document_date: row.document_date,
            line_id: row.line_id.into(),
            quantity: row.quantity,
            total_amount: Money::new(row.total_amount),
        })
        .collect())
}

pub async fn set_line_cost(conn: &mut PgConnection, line: Uuid, cost: Decimal) -> Result<(), DatabaseError> {
    let result = sqlx::query("UPDATE document_lines SET total_cost = $2 WHERE id = $1")
        .bind(line)
        .bind(cost)
        .execute(conn)
        .await?;

    if result.rows_affected() == 0 {
        return Err(DatabaseError::not_found("DocumentLine", line));
    }
    Ok(())
}

/// Flags a document posted; zero affected rows means another transaction
/// posted it first
pub async fn mark_posted(conn: &mut PgConnection, id: DocumentId, at: DateTime<Utc>) -> Result<(), DatabaseError> {
    let result = sqlx::query("UPDATE documents SET is_posted = TRUE, last_updated = $2 WHERE id = $1 AND NOT is_posted")
        .bind(id.as_uuid())
        .bind(at)
        .execute(conn)
        .await?;

    if result.rows_affected() == 0 {
        return Err(DatabaseError::SerializationConflict(format!(
            "document {} was posted concurrently",
            id
        )));
    }
    Ok(())
}

async fn fetch_document(
    conn: &mut PgConnection,
    id: DocumentId,
    for_update: bool,
) -> Result<Option<Document>, DatabaseError> {
    let lock = if for_update { " FOR UPDATE" } else { "" };
    let header = sqlx::query_as::<_, DocumentRow>(&format!(
        "SELECT {} FROM documents WHERE id = $1{}",
        DOCUMENT_COLUMNS, lock
    ))
    .bind(id.as_uuid())
    .fetch_optional(&mut *conn)
    .await?;

    let Some(header) = header else {
        return Ok(None);
    };

    let lines = fetch_lines(&mut *conn, header.id).await?;
    Ok(Some(header.into_domain(lines)))
}

async fn fetch_lines<'e, E: PgExecutor<'e>>(executor: E, document_id: Uuid) -> Result<Vec<DocumentLine>, DatabaseError> {
    let rows = sqlx::query_as::<_, LineRow>(&format!(
        "SELECT {} FROM document_lines l JOIN nomenclature n ON n.id = l.nomenclature_id WHERE l.document_id = $1 ORDER BY l.line_no",
        LINE_COLUMNS
    ))
    .bind(document_id)
    .fetch_all(executor)
    .await?;
    Ok(rows.into_iter().map(LineRow::into_domain).collect())
}

// ============================================================================
// Row types
// ============================================================================

const DOCUMENT_COLUMNS: &str = "id, document_date, operation_type, is_posted, counterparty_id, \
     contract_name, currency, total_amount, last_updated";

const LINE_COLUMNS: &str = "l.id, l.document_id, l.line_no, l.nomenclature_id, n.name AS item_name, \
     l.account, l.quantity, l.unit, l.price_with_vat, l.total_with_vat, l.vat_amount, \
     l.total_amount, l.total_cost";

const BALANCE_COLUMNS: &str = "nomenclature_id, account, quantity, total_amount, last_updated";

#[derive(Debug, sqlx::FromRow)]
struct NomenclatureRow {
    id: Uuid,
    name: String,
    vat_rate: Option<Decimal>,
}

impl NomenclatureRow {
    fn into_domain(self) -> Nomenclature {
        Nomenclature {
            id: self.id.into(),
            name: self.name,
            vat_rate: self.vat_rate.map(Rate::new),
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct DocumentRow {
    id: Uuid,
    document_date: DateTime<Utc>,
    operation_type: String,
    is_posted: bool,
    counterparty_id: Option<Uuid>,
    contract_name: Option<String>,
    currency: String,
    total_amount: Decimal,
    last_updated: Option<DateTime<Utc>>,
}

impl DocumentRow {
    fn into_domain(self, lines: Vec<DocumentLine>) -> Document {
        Document {
            id: self.id.into(),
            document_date: self.document_date,
            operation_type: self.operation_type,
            is_posted: self.is_posted,
            counterparty_id: self.counterparty_id.map(CounterpartyId::from),
            contract_name: self.contract_name,
            currency: self.currency,
            total_amount: Money::new(self.total_amount),
            last_updated: self.last_updated,
            lines,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct LineRow {
    id: Uuid,
    document_id: Uuid,
    line_no: i32,
    nomenclature_id: Uuid,
    item_name: String,
    account: String,
    quantity: Decimal,
    unit: String,
    price_with_vat: Decimal,
    total_with_vat: Decimal,
    vat_amount: Decimal,
    total_amount: Decimal,
    total_cost: Option<Decimal>,
}

impl LineRow {
    fn into_domain(self) -> DocumentLine {
        DocumentLine {
            id: self.id.into(),
            document_id: self.document_id.into(),
            line_no: self.line_no,
            nomenclature_id: self.nomenclature_id.into(),
            item_name: Some(self.item_name),
            account: self.account,
            quantity: self.quantity,
            unit: self.unit,
            price_with_vat: Money::new(self.price_with_vat),
            total_with_vat: Money::new(self.total_with_vat),
            vat_amount: Money::new(self.vat_amount),
            total_amount: Money::new(self.total_amount),
            total_cost: self.total_cost.map(Money::new),
        }
    }
}

const POSTING_ORDER: &str = "ORDER BY d.document_date, d.id, l.line_no";

fn posted_lines_select() -> String {
    format!(
        "SELECT d.document_date, d.operation_type, d.counterparty_id, {} \
         FROM document_lines l \
         JOIN documents d ON d.id = l.document_id \
         JOIN nomenclature n ON n.id = l.nomenclature_id",
        LINE_COLUMNS
    )
}

#[derive(Debug, sqlx::FromRow)]
struct PostedLineRow {
    document_date: DateTime<Utc>,
    operation_type: String,
    counterparty_id: Option<Uuid>,
    #[sqlx(flatten)]
    line: LineRow,
}

impl PostedLineRow {
    fn into_domain(self) -> PostedLine {
        PostedLine {
            document_id: DocumentId::from(self.line.document_id),
            document_date: self.document_date,
            operation_type: self.operation_type,
            counterparty_id: self.counterparty_id.map(CounterpartyId::from),
            line: self.line.into_domain(),
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct BalanceRow {
    nomenclature_id: Uuid,
    account: String,
    quantity: Decimal,
    total_amount: Decimal,
    last_updated: Option<DateTime<Utc>>,
}

impl BalanceRow {
    fn into_domain(self) -> InventoryBalance {
        InventoryBalance {
            nomenclature_id: self.nomenclature_id.into(),
            account: self.account,
            quantity: self.quantity,
            total_amount: Money::new(self.total_amount),
            last_updated: self.last_updated,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct BatchRow {
    document_id: Uuid,
    document_date: DateTime<Utc>,
    line_id: Uuid,
    quantity: Decimal,
    total_amount: Decimal,
}
