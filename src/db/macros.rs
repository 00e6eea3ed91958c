//! Database dispatch macros for reducing code duplication.
//!
//! The pool, connection, handle and transaction types are all three-variant
//! enums with the same variant names (`MySql`, `Postgres`, `SQLite`). The
//! macro below generates the match over any of them while keeping each arm
//! readable on its own line.

/// Generate match arms for a backend enum.
///
/// The enum named by the first argument must be in scope at the call site.
///
/// # Example
///
/// ```ignore
/// impl_db_dispatch!(DbPool, pool, {
///     MySql(p) => do_mysql(p),
///     Postgres(p) => do_postgres(p),
///     SQLite(p) => do_sqlite(p),
/// });
/// ```
#[macro_export]
macro_rules! impl_db_dispatch {
    ($enum:ident, $value:expr, { $($variant:ident($p:ident) => $body:expr),+ $(,)? }) => {
        match $value {
            $(
                $enum::$variant($p) => $body,
            )+
        }
    };
}

pub use impl_db_dispatch;
