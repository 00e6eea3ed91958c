//! Row <-> record conversions.
//!
//! Reads go through [`FromDbRow`], which has one method per backend row type
//! so the executor can stay concrete. Writes go through [`user_params`], which
//! fixes the column order used by every insert.

use crate::models::{ColumnDescriptor, QueryParam, User, split_declared_type};
use chrono::NaiveDateTime;
use sqlx::mysql::MySqlRow;
use sqlx::postgres::PgRow;
use sqlx::sqlite::SqliteRow;
use sqlx::{ColumnIndex, Decode, Row, Type};

/// Column list selected for every user read, in mapping order.
pub const USER_COLUMNS: &str = "id, name, email, department, role, active, created_at, updated_at";

/// A value that can be built from a row of any supported backend.
pub trait FromDbRow: Sized {
    fn from_mysql(row: &MySqlRow) -> Result<Self, sqlx::Error>;
    fn from_postgres(row: &PgRow) -> Result<Self, sqlx::Error>;
    fn from_sqlite(row: &SqliteRow) -> Result<Self, sqlx::Error>;
}

fn map_user<'r, R>(row: &'r R) -> Result<User, sqlx::Error>
where
    R: Row,
    &'r str: ColumnIndex<R>,
    i64: Decode<'r, R::Database> + Type<R::Database>,
    String: Decode<'r, R::Database> + Type<R::Database>,
    bool: Decode<'r, R::Database> + Type<R::Database>,
    NaiveDateTime: Decode<'r, R::Database> + Type<R::Database>,
{
    Ok(User {
        id: Some(row.try_get::<i64, _>("id")?),
        name: row.try_get("name")?,
        email: row.try_get("email")?,
        department: row.try_get("department")?,
        role: row.try_get("role")?,
        active: row.try_get("active")?,
        created_at: row.try_get::<Option<NaiveDateTime>, _>("created_at")?,
        updated_at: row.try_get::<Option<NaiveDateTime>, _>("updated_at")?,
    })
}

impl FromDbRow for User {
    fn from_mysql(row: &MySqlRow) -> Result<Self, sqlx::Error> {
        map_user(row)
    }

    fn from_postgres(row: &PgRow) -> Result<Self, sqlx::Error> {
        map_user(row)
    }

    fn from_sqlite(row: &SqliteRow) -> Result<Self, sqlx::Error> {
        map_user(row)
    }
}

/// Single-column scalar results (counts, probes, version strings).
macro_rules! impl_scalar_row {
    ($($ty:ty),+) => {
        $(
            impl FromDbRow for $ty {
                fn from_mysql(row: &MySqlRow) -> Result<Self, sqlx::Error> {
                    row.try_get(0)
                }

                fn from_postgres(row: &PgRow) -> Result<Self, sqlx::Error> {
                    row.try_get(0)
                }

                fn from_sqlite(row: &SqliteRow) -> Result<Self, sqlx::Error> {
                    row.try_get(0)
                }
            }
        )+
    };
}

impl_scalar_row!(i64, String, Option<String>);

/// Catalog rows for the server backends share one shape:
/// `name, type, size, is_nullable ('YES'/'NO'), column_default`.
fn map_catalog_column<'r, R>(row: &'r R) -> Result<ColumnDescriptor, sqlx::Error>
where
    R: Row,
    &'r str: ColumnIndex<R>,
    i64: Decode<'r, R::Database> + Type<R::Database>,
    String: Decode<'r, R::Database> + Type<R::Database>,
{
    let is_nullable: String = row.try_get("is_nullable")?;
    Ok(ColumnDescriptor::new(
        row.try_get::<String, _>("name")?,
        row.try_get::<String, _>("type")?,
        is_nullable.eq_ignore_ascii_case("YES"),
    )
    .with_size(row.try_get::<Option<i64>, _>("size")?)
    .with_default(row.try_get::<Option<String>, _>("column_default")?))
}

impl FromDbRow for ColumnDescriptor {
    fn from_mysql(row: &MySqlRow) -> Result<Self, sqlx::Error> {
        map_catalog_column(row)
    }

    fn from_postgres(row: &PgRow) -> Result<Self, sqlx::Error> {
        map_catalog_column(row)
    }

    /// `pragma_table_info` reports the declared type (`VARCHAR(50)`) and a
    /// `notnull` flag instead of the information_schema columns.
    fn from_sqlite(row: &SqliteRow) -> Result<Self, sqlx::Error> {
        let declared: String = row.try_get("type")?;
        let (data_type, size) = split_declared_type(&declared);
        let not_null: i64 = row.try_get("notnull")?;
        let pk: i64 = row.try_get("pk")?;
        // INTEGER PRIMARY KEY is the rowid and can never hold NULL.
        let nullable = not_null == 0 && !(pk > 0 && data_type.eq_ignore_ascii_case("INTEGER"));
        Ok(ColumnDescriptor::new(row.try_get::<String, _>("name")?, data_type, nullable)
            .with_size(size)
            .with_default(row.try_get::<Option<String>, _>("dflt_value")?))
    }
}

/// Parameters for an insert, in column order:
/// name, email, department, role, active, created_at, updated_at.
pub fn user_params(user: &User) -> Vec<QueryParam> {
    vec![
        QueryParam::from(user.name.as_str()),
        QueryParam::from(user.email.as_str()),
        QueryParam::from(user.department.as_str()),
        QueryParam::from(user.role.as_str()),
        QueryParam::from(user.active),
        QueryParam::from(user.created_at),
        QueryParam::from(user.updated_at),
    ]
}
