use crate::{
    error::ConnectorError,
    source::{SourceStore, TablePage, schema::SourceSchema},
};
use async_trait::async_trait;
use chrono::NaiveDateTime;
use model::{
    mapping::{DiscoveredColumn, DiscoveredTable},
    record::{CategoryAssociation, CategoryNode, RecordBatch, SourceImage, SourceRecord, SpecialPrice, Measurement},
};
use sqlx::{MySql, Pool, Row, mysql::MySqlRow};
use std::{collections::HashMap, future::Future, time::Duration};
use tracing::debug;

/// Quotes a MySQL identifier. Backticks inside names are rejected rather
/// than escaped; discovery never produces them and nothing else should.
fn quote_ident(name: &str) -> Result<String, ConnectorError> {
    if name.contains('`') {
        return Err(ConnectorError::UnexpectedResponse(format!(
            "Invalid identifier: {name}"
        )));
    }
    Ok(format!("`{name}`"))
}

fn placeholders(n: usize) -> String {
    let mut s = String::with_capacity(n * 2);
    for i in 0..n {
        if i > 0 {
            s.push(',');
        }
        s.push('?');
    }
    s
}

pub struct MySqlSourceStore {
    pool: Pool<MySql>,
    schema: SourceSchema,
    timeout: Duration,
}

impl MySqlSourceStore {
    pub async fn connect(
        url: &str,
        schema: SourceSchema,
        timeout: Duration,
    ) -> Result<Self, ConnectorError> {
        let pool = Pool::connect(url).await?;
        Ok(MySqlSourceStore {
            pool,
            schema,
            timeout,
        })
    }

    pub fn with_pool(pool: Pool<MySql>, schema: SourceSchema, timeout: Duration) -> Self {
        MySqlSourceStore {
            pool,
            schema,
            timeout,
        }
    }

    async fn timed<T, F>(&self, fut: F) -> Result<T, ConnectorError>
    where
        F: Future<Output = Result<T, sqlx::Error>>,
    {
        match tokio::time::timeout(self.timeout, fut).await {
            Ok(result) => Ok(result?),
            Err(_) => Err(ConnectorError::Timeout(self.timeout)),
        }
    }

    fn product_select(&self) -> Result<String, ConnectorError> {
        let c = &self.schema.product;
        // Numeric columns are cast to DOUBLE so DECIMAL sources decode
        // uniformly; datetimes come back as DATETIME.
        let sql = format!(
            "SELECT {id} AS id, {sku} AS sku, {name} AS name, {description} AS description, \
             {brand} AS brand, CAST({price} AS DOUBLE) AS price, \
             CAST({special_price} AS DOUBLE) AS special_price, \
             {special_from} AS special_from, {special_to} AS special_to, \
             CAST({weight} AS DOUBLE) AS weight, {weight_unit} AS weight_unit, \
             CAST({length} AS DOUBLE) AS length, CAST({width} AS DOUBLE) AS width, \
             CAST({height} AS DOUBLE) AS height, {dimension_unit} AS dimension_unit \
             FROM {table} WHERE {id} > ? ORDER BY {id} LIMIT ?",
            id = quote_ident(&c.id)?,
            sku = quote_ident(&c.sku)?,
            name = quote_ident(&c.name)?,
            description = quote_ident(&c.description)?,
            brand = quote_ident(&c.brand)?,
            price = quote_ident(&c.price)?,
            special_price = quote_ident(&c.special_price)?,
            special_from = quote_ident(&c.special_from)?,
            special_to = quote_ident(&c.special_to)?,
            weight = quote_ident(&c.weight)?,
            weight_unit = quote_ident(&c.weight_unit)?,
            length = quote_ident(&c.length)?,
            width = quote_ident(&c.width)?,
            height = quote_ident(&c.height)?,
            dimension_unit = quote_ident(&c.dimension_unit)?,
            table = quote_ident(&self.schema.product_table)?,
        );
        Ok(sql)
    }

    fn record_from_row(row: &MySqlRow) -> Result<SourceRecord, sqlx::Error> {
        let measurement = |value: Option<f64>, unit: Option<String>| {
            value.and_then(|v| {
                unit.as_ref().map(|u| Measurement {
                    value: v,
                    unit: u.clone(),
                })
            })
        };

        let weight_unit: Option<String> = row.try_get("weight_unit")?;
        let dim_unit: Option<String> = row.try_get("dimension_unit")?;
        let special_amount: Option<f64> = row.try_get("special_price")?;
        let special_from: Option<NaiveDateTime> = row.try_get("special_from")?;
        let special_to: Option<NaiveDateTime> = row.try_get("special_to")?;

        Ok(SourceRecord {
            id: row.try_get::<u64, _>("id")?,
            sku: row.try_get("sku")?,
            name: row.try_get("name")?,
            description: row.try_get("description")?,
            brand: row.try_get("brand")?,
            regular_price: row.try_get::<Option<f64>, _>("price")?.unwrap_or(0.0),
            special_price: special_amount.map(|amount| SpecialPrice {
                amount,
                from: special_from.map(|d| d.and_utc()),
                to: special_to.map(|d| d.and_utc()),
            }),
            weight: measurement(row.try_get("weight")?, weight_unit),
            length: measurement(row.try_get("length")?, dim_unit.clone()),
            width: measurement(row.try_get("width")?, dim_unit.clone()),
            height: measurement(row.try_get("height")?, dim_unit),
            images: Vec::new(),
            categories: Vec::new(),
            tags: Vec::new(),
        })
    }

    async fn attach_images(
        &self,
        records: &mut HashMap<u64, SourceRecord>,
        ids: &[u64],
    ) -> Result<(), ConnectorError> {
        let sql = format!(
            "SELECT product_id, path, position, is_main FROM {} \
             WHERE product_id IN ({}) ORDER BY product_id, position",
            quote_ident(&self.schema.image_table)?,
            placeholders(ids.len()),
        );
        let mut query = sqlx::query(&sql);
        for id in ids {
            query = query.bind(id);
        }
        let rows = self.timed(query.fetch_all(&self.pool)).await?;
        for row in rows {
            let product_id: u64 = row.try_get("product_id").map_err(ConnectorError::from)?;
            if let Some(record) = records.get_mut(&product_id) {
                record.images.push(SourceImage {
                    path: row.try_get("path").map_err(ConnectorError::from)?,
                    position: row
                        .try_get::<i64, _>("position")
                        .map_err(ConnectorError::from)? as u32,
                    is_main: row
                        .try_get::<i64, _>("is_main")
                        .map_err(ConnectorError::from)?
                        != 0,
                });
            }
        }
        Ok(())
    }

    async fn attach_categories(
        &self,
        records: &mut HashMap<u64, SourceRecord>,
        ids: &[u64],
    ) -> Result<(), ConnectorError> {
        let sql = format!(
            "SELECT pc.product_id, pc.category_id, c.depth, c.sort_order, pc.is_main \
             FROM {assoc} pc JOIN {cat} c ON c.id = pc.category_id \
             WHERE pc.product_id IN ({ph})",
            assoc = quote_ident(&self.schema.product_category_table)?,
            cat = quote_ident(&self.schema.category_table)?,
            ph = placeholders(ids.len()),
        );
        let mut query = sqlx::query(&sql);
        for id in ids {
            query = query.bind(id);
        }
        let rows = self.timed(query.fetch_all(&self.pool)).await?;
        for row in rows {
            let product_id: u64 = row.try_get("product_id").map_err(ConnectorError::from)?;
            if let Some(record) = records.get_mut(&product_id) {
                record.categories.push(CategoryAssociation {
                    category_id: row.try_get("category_id").map_err(ConnectorError::from)?,
                    depth: row
                        .try_get::<i64, _>("depth")
                        .map_err(ConnectorError::from)? as u32,
                    sort_order: row
                        .try_get::<i64, _>("sort_order")
                        .map_err(ConnectorError::from)? as u32,
                    is_main: row
                        .try_get::<i64, _>("is_main")
                        .map_err(ConnectorError::from)?
                        != 0,
                });
            }
        }
        Ok(())
    }

    async fn attach_tags(
        &self,
        records: &mut HashMap<u64, SourceRecord>,
        ids: &[u64],
    ) -> Result<(), ConnectorError> {
        let sql = format!(
            "SELECT product_id, tag FROM {} WHERE product_id IN ({})",
            quote_ident(&self.schema.tag_table)?,
            placeholders(ids.len()),
        );
        let mut query = sqlx::query(&sql);
        for id in ids {
            query = query.bind(id);
        }
        let rows = self.timed(query.fetch_all(&self.pool)).await?;
        for row in rows {
            let product_id: u64 = row.try_get("product_id").map_err(ConnectorError::from)?;
            if let Some(record) = records.get_mut(&product_id) {
                record
                    .tags
                    .push(row.try_get("tag").map_err(ConnectorError::from)?);
            }
        }
        Ok(())
    }
}

#[async_trait]
impl SourceStore for MySqlSourceStore {
    async fn fetch_batch(&self, cursor: u64, limit: u32) -> Result<RecordBatch, ConnectorError> {
        let sql = self.product_select()?;
        let rows = self
            .timed(
                sqlx::query(&sql)
                    .bind(cursor)
                    .bind(limit)
                    .fetch_all(&self.pool),
            )
            .await?;

        let mut ordered_ids = Vec::with_capacity(rows.len());
        let mut by_id = HashMap::with_capacity(rows.len());
        for row in &rows {
            let record = Self::record_from_row(row)?;
            ordered_ids.push(record.id);
            by_id.insert(record.id, record);
        }

        if !ordered_ids.is_empty() {
            self.attach_images(&mut by_id, &ordered_ids).await?;
            self.attach_categories(&mut by_id, &ordered_ids).await?;
            self.attach_tags(&mut by_id, &ordered_ids).await?;
        }

        let next_cursor = ordered_ids.last().copied().unwrap_or(cursor);
        let records = ordered_ids
            .iter()
            .filter_map(|id| by_id.remove(id))
            .collect::<Vec<_>>();

        debug!(
            cursor,
            next_cursor,
            count = records.len(),
            "Fetched source batch"
        );
        Ok(RecordBatch {
            records,
            next_cursor,
        })
    }

    async fn count_records(&self) -> Result<u64, ConnectorError> {
        let sql = format!(
            "SELECT COUNT(*) FROM {}",
            quote_ident(&self.schema.product_table)?
        );
        let row = self.timed(sqlx::query(&sql).fetch_one(&self.pool)).await?;
        Ok(row.try_get::<i64, _>(0).map_err(ConnectorError::from)? as u64)
    }

    async fn load_category_tree(&self) -> Result<HashMap<u64, CategoryNode>, ConnectorError> {
        let sql = format!(
            "SELECT id, name, parent_id, depth, sort_order FROM {}",
            quote_ident(&self.schema.category_table)?
        );
        let rows = self.timed(sqlx::query(&sql).fetch_all(&self.pool)).await?;
        let mut tree = HashMap::with_capacity(rows.len());
        for row in rows {
            let node = CategoryNode {
                id: row.try_get("id").map_err(ConnectorError::from)?,
                name: row.try_get("name").map_err(ConnectorError::from)?,
                parent_id: row.try_get("parent_id").map_err(ConnectorError::from)?,
                depth: row
                    .try_get::<i64, _>("depth")
                    .map_err(ConnectorError::from)? as u32,
                sort_order: row
                    .try_get::<i64, _>("sort_order")
                    .map_err(ConnectorError::from)? as u32,
            };
            tree.insert(node.id, node);
        }
        Ok(tree)
    }

    async fn list_tables(&self) -> Result<Vec<DiscoveredTable>, ConnectorError> {
        let table_rows = self
            .timed(
                sqlx::query(
                    "SELECT TABLE_NAME, TABLE_ROWS FROM information_schema.tables \
                     WHERE table_schema = DATABASE() ORDER BY TABLE_NAME",
                )
                .fetch_all(&self.pool),
            )
            .await?;

        let mut tables = Vec::with_capacity(table_rows.len());
        for table_row in table_rows {
            let name: String = table_row.try_get(0).map_err(ConnectorError::from)?;
            let row_count: Option<i64> = table_row.try_get(1).map_err(ConnectorError::from)?;

            let column_rows = self
                .timed(
                    sqlx::query(
                        "SELECT COLUMN_NAME, DATA_TYPE, IS_NULLABLE \
                         FROM information_schema.columns \
                         WHERE table_schema = DATABASE() AND table_name = ? \
                         ORDER BY ORDINAL_POSITION",
                    )
                    .bind(&name)
                    .fetch_all(&self.pool),
                )
                .await?;

            let columns = column_rows
                .iter()
                .map(|row| {
                    Ok(DiscoveredColumn {
                        name: row.try_get(0)?,
                        data_type: row.try_get(1)?,
                        nullable: row.try_get::<String, _>(2)? == "YES",
                    })
                })
                .collect::<Result<Vec<_>, sqlx::Error>>()?;

            tables.push(DiscoveredTable {
                name,
                row_count: row_count.map(|n| n as u64),
                columns,
            });
        }
        Ok(tables)
    }

    async fn table_ddl(&self, table: &str) -> Result<String, ConnectorError> {
        let sql = format!("SHOW CREATE TABLE {}", quote_ident(table)?);
        let row = self.timed(sqlx::query(&sql).fetch_one(&self.pool)).await?;
        // Column 0 is the table name, column 1 the CREATE statement.
        Ok(row.try_get::<String, _>(1).map_err(ConnectorError::from)?)
    }

    async fn fetch_page(
        &self,
        table: &str,
        offset: u64,
        limit: u32,
    ) -> Result<TablePage, ConnectorError> {
        let column_rows = self
            .timed(
                sqlx::query(
                    "SELECT COLUMN_NAME FROM information_schema.columns \
                     WHERE table_schema = DATABASE() AND table_name = ? \
                     ORDER BY ORDINAL_POSITION",
                )
                .bind(table)
                .fetch_all(&self.pool),
            )
            .await?;
        let columns = column_rows
            .iter()
            .map(|row| row.try_get::<String, _>(0))
            .collect::<Result<Vec<_>, sqlx::Error>>()?;
        if columns.is_empty() {
            return Err(ConnectorError::UnexpectedResponse(format!(
                "Unknown table: {table}"
            )));
        }

        // Every column is cast to CHAR so heterogeneous types stringify
        // uniformly for the CSV encoder.
        let select_list = columns
            .iter()
            .map(|col| {
                Ok(format!(
                    "CAST({c} AS CHAR) AS {c}",
                    c = quote_ident(col)?
                ))
            })
            .collect::<Result<Vec<_>, ConnectorError>>()?
            .join(", ");
        let sql = format!(
            "SELECT {select_list} FROM {} LIMIT ? OFFSET ?",
            quote_ident(table)?
        );

        let rows = self
            .timed(
                sqlx::query(&sql)
                    .bind(limit)
                    .bind(offset)
                    .fetch_all(&self.pool),
            )
            .await?;

        let mut out_rows = Vec::with_capacity(rows.len());
        for row in rows {
            let mut fields = Vec::with_capacity(columns.len());
            for idx in 0..columns.len() {
                let value: Option<String> = row.try_get(idx).map_err(ConnectorError::from)?;
                fields.push(value.unwrap_or_default());
            }
            out_rows.push(fields);
        }

        Ok(TablePage {
            columns,
            rows: out_rows,
        })
    }
}
