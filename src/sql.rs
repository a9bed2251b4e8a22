use chrono::{DateTime, NaiveDate};
use sqlparser::ast::{
    self, AssignmentTarget, Expr, FromTable, ObjectNamePart, SetExpr, Statement, TableFactor,
    TableObject, Value, ValueWithSpan,
};
use sqlparser::dialect::PostgreSqlDialect;
use sqlparser::parser::Parser;

use crate::model::*;

/// Parsed command from SQL input.
#[derive(Debug, PartialEq)]
pub enum Command {
    AddVehicle {
        model: String,
        size: VehicleSize,
        price_per_day: f64,
    },
    SelectVehicles {
        size: Option<VehicleSize>,
    },
    SelectAvailable {
        period: Period,
        size: Option<VehicleSize>,
    },
    SetVehiclePrice {
        id: VehicleId,
        price_per_day: f64,
    },
    RemoveVehicle {
        id: VehicleId,
    },
    ReserveVehicle {
        vehicle_id: VehicleId,
        period: Period,
    },
    SelectReservations {
        vehicle_id: VehicleId,
    },
}

pub fn parse_sql(sql: &str) -> Result<Command, SqlError> {
    let dialect = PostgreSqlDialect {};
    let stmts = Parser::parse_sql(&dialect, sql).map_err(|e| SqlError::Parse(e.to_string()))?;
    if stmts.is_empty() {
        return Err(SqlError::Empty);
    }

    match &stmts[0] {
        Statement::Insert(insert) => parse_insert(insert),
        Statement::Delete(delete) => parse_delete(delete),
        Statement::Update {
            table,
            assignments,
            selection,
            ..
        } => parse_update(table, assignments, selection),
        Statement::Query(query) => parse_select(query),
        other => Err(SqlError::Unsupported(format!("{other}"))),
    }
}

fn parse_insert(insert: &ast::Insert) -> Result<Command, SqlError> {
    let table = insert_table_name(insert)?;
    let values = extract_insert_values(insert)?;

    match table.as_str() {
        "vehicles" => {
            if values.len() < 3 {
                return Err(SqlError::WrongArity("vehicles", 3, values.len()));
            }
            Ok(Command::AddVehicle {
                model: parse_string(&values[0])?,
                size: parse_size(&values[1])?,
                price_per_day: parse_f64(&values[2])?,
            })
        }
        "reservations" => {
            if values.len() < 3 {
                return Err(SqlError::WrongArity("reservations", 3, values.len()));
            }
            let period = parse_period(parse_date(&values[1])?, parse_date(&values[2])?)?;
            Ok(Command::ReserveVehicle {
                vehicle_id: VehicleId::from(parse_string(&values[0])?),
                period,
            })
        }
        _ => Err(SqlError::UnknownTable(table)),
    }
}

fn parse_delete(delete: &ast::Delete) -> Result<Command, SqlError> {
    let table = delete_table_name(delete)?;

    match table.as_str() {
        "vehicles" => Ok(Command::RemoveVehicle {
            id: extract_where_id(&delete.selection)?,
        }),
        "reservations" => Err(SqlError::Unsupported(
            "reservations cannot be cancelled".into(),
        )),
        _ => Err(SqlError::UnknownTable(table)),
    }
}

fn parse_update(
    table: &ast::TableWithJoins,
    assignments: &[ast::Assignment],
    selection: &Option<Expr>,
) -> Result<Command, SqlError> {
    let name = table_factor_name(&table.relation)?;
    if name != "vehicles" {
        return Err(SqlError::UnknownTable(name));
    }

    let mut price_per_day = None;
    for assignment in assignments {
        let column = match &assignment.target {
            AssignmentTarget::ColumnName(col) => object_name_last(col),
            _ => None,
        };
        match column.as_deref() {
            Some("price_per_day") => price_per_day = Some(parse_f64(&assignment.value)?),
            Some(other) => {
                return Err(SqlError::Unsupported(format!("cannot update column {other}")));
            }
            None => return Err(SqlError::Parse("unsupported assignment target".into())),
        }
    }

    Ok(Command::SetVehiclePrice {
        id: extract_where_id(selection)?,
        price_per_day: price_per_day.ok_or(SqlError::MissingFilter("price_per_day"))?,
    })
}

fn parse_select(query: &ast::Query) -> Result<Command, SqlError> {
    let select = match query.body.as_ref() {
        SetExpr::Select(s) => s,
        _ => return Err(SqlError::Unsupported("non-SELECT query".into())),
    };

    if select.from.is_empty() {
        return Err(SqlError::Parse("SELECT without FROM".into()));
    }
    let table = table_factor_name(&select.from[0].relation)?;

    let mut filters = SelectFilters::default();
    if let Some(selection) = &select.selection {
        extract_filters(selection, &mut filters)?;
    }

    match table.as_str() {
        "vehicles" => {
            filters.reject_other_than(&["size"])?;
            Ok(Command::SelectVehicles { size: filters.size })
        }
        "availability" => {
            filters.reject_other_than(&["size", "pickup_date", "return_date"])?;
            let period = parse_period(
                filters.pickup_date.ok_or(SqlError::MissingFilter("pickup_date"))?,
                filters.return_date.ok_or(SqlError::MissingFilter("return_date"))?,
            )?;
            Ok(Command::SelectAvailable {
                period,
                size: filters.size,
            })
        }
        "reservations" => {
            filters.reject_other_than(&["vehicle_id"])?;
            Ok(Command::SelectReservations {
                vehicle_id: filters
                    .vehicle_id
                    .ok_or(SqlError::MissingFilter("vehicle_id"))?,
            })
        }
        _ => Err(SqlError::UnknownTable(table)),
    }
}

#[derive(Default)]
struct SelectFilters {
    size: Option<VehicleSize>,
    pickup_date: Option<NaiveDate>,
    return_date: Option<NaiveDate>,
    vehicle_id: Option<VehicleId>,
    /// Columns seen in the WHERE clause, in order.
    columns: Vec<String>,
}

impl SelectFilters {
    fn reject_other_than(&self, allowed: &[&str]) -> Result<(), SqlError> {
        match self.columns.iter().find(|c| !allowed.contains(&c.as_str())) {
            Some(col) => Err(SqlError::Unsupported(format!("filter on {col}"))),
            None => Ok(()),
        }
    }
}

fn extract_filters(expr: &Expr, filters: &mut SelectFilters) -> Result<(), SqlError> {
    match expr {
        Expr::Nested(inner) => extract_filters(inner, filters),
        Expr::BinaryOp { left, op, right } => {
            if *op == ast::BinaryOperator::And {
                extract_filters(left, filters)?;
                return extract_filters(right, filters);
            }
            let col = expr_column_name(left)
                .ok_or_else(|| SqlError::Parse(format!("expected column, got {left}")))?;
            match (col.as_str(), op) {
                ("size", ast::BinaryOperator::Eq) => filters.size = Some(parse_size(right)?),
                ("vehicle_id", ast::BinaryOperator::Eq) => {
                    filters.vehicle_id = Some(VehicleId::from(parse_string(right)?));
                }
                ("pickup_date", ast::BinaryOperator::GtEq | ast::BinaryOperator::Eq) => {
                    filters.pickup_date = Some(parse_date(right)?);
                }
                ("return_date", ast::BinaryOperator::LtEq | ast::BinaryOperator::Eq) => {
                    filters.return_date = Some(parse_date(right)?);
                }
                (known, op) if is_known_column(known) => {
                    return Err(SqlError::Unsupported(format!("operator {op} on {known}")));
                }
                _ => {}
            }
            filters.columns.push(col);
            Ok(())
        }
        other => Err(SqlError::Unsupported(format!("WHERE clause {other}"))),
    }
}

fn is_known_column(col: &str) -> bool {
    matches!(col, "size" | "vehicle_id" | "pickup_date" | "return_date")
}

fn parse_period(pickup_date: NaiveDate, return_date: NaiveDate) -> Result<Period, SqlError> {
    if pickup_date > return_date {
        return Err(SqlError::InvalidPeriod {
            pickup_date,
            return_date,
        });
    }
    Ok(Period::new(pickup_date, return_date))
}

// ── Helpers ───────────────────────────────────────────────────

fn object_name_last(name: &ast::ObjectName) -> Option<String> {
    name.0.last().and_then(|part| match part {
        ObjectNamePart::Identifier(ident) => Some(ident.value.to_lowercase()),
        _ => None,
    })
}

fn insert_table_name(insert: &ast::Insert) -> Result<String, SqlError> {
    match &insert.table {
        TableObject::TableName(name) => {
            object_name_last(name).ok_or_else(|| SqlError::Parse("empty table name".into()))
        }
        _ => Err(SqlError::Parse("unsupported table object in INSERT".into())),
    }
}

fn delete_table_name(delete: &ast::Delete) -> Result<String, SqlError> {
    let tables_with_joins = match &delete.from {
        FromTable::WithFromKeyword(t) | FromTable::WithoutKeyword(t) => t,
    };
    if let Some(first) = tables_with_joins.first() {
        table_factor_name(&first.relation)
    } else {
        Err(SqlError::Parse("DELETE without table".into()))
    }
}

fn table_factor_name(tf: &TableFactor) -> Result<String, SqlError> {
    match tf {
        TableFactor::Table { name, .. } => {
            object_name_last(name).ok_or_else(|| SqlError::Parse("empty table name".into()))
        }
        _ => Err(SqlError::Parse("complex table expression".into())),
    }
}

fn extract_insert_values(insert: &ast::Insert) -> Result<Vec<Expr>, SqlError> {
    let body = insert
        .source
        .as_ref()
        .ok_or(SqlError::Parse("no VALUES".into()))?;
    match body.body.as_ref() {
        SetExpr::Values(values) => match values.rows.as_slice() {
            [] => Err(SqlError::Parse("empty VALUES".into())),
            [row] => Ok(row.clone()),
            _ => Err(SqlError::Unsupported("multi-row INSERT".into())),
        },
        _ => Err(SqlError::Parse("expected VALUES".into())),
    }
}

fn extract_where_id(selection: &Option<Expr>) -> Result<VehicleId, SqlError> {
    let sel = selection.as_ref().ok_or(SqlError::MissingFilter("id"))?;
    match sel {
        Expr::BinaryOp {
            left,
            op: ast::BinaryOperator::Eq,
            right,
        } if expr_column_name(left).as_deref() == Some("id") => {
            Ok(VehicleId::from(parse_string(right)?))
        }
        _ => Err(SqlError::MissingFilter("id")),
    }
}

fn expr_column_name(expr: &Expr) -> Option<String> {
    match expr {
        Expr::Identifier(ident) => Some(ident.value.to_lowercase()),
        Expr::CompoundIdentifier(parts) => parts.last().map(|i| i.value.to_lowercase()),
        _ => None,
    }
}

fn extract_value(expr: &Expr) -> Option<&Value> {
    match expr {
        Expr::Value(ValueWithSpan { value, .. }) => Some(value),
        _ => None,
    }
}

fn parse_string(expr: &Expr) -> Result<String, SqlError> {
    match extract_value(expr) {
        Some(Value::SingleQuotedString(s)) => Ok(s.clone()),
        Some(value) => Err(SqlError::Parse(format!("expected string, got {value}"))),
        None => Err(SqlError::Parse(format!("expected value, got {expr}"))),
    }
}

fn parse_size(expr: &Expr) -> Result<VehicleSize, SqlError> {
    parse_string(expr)?.parse().map_err(SqlError::Parse)
}

fn parse_f64(expr: &Expr) -> Result<f64, SqlError> {
    if let Some(value) = extract_value(expr) {
        match value {
            Value::Number(s, _) | Value::SingleQuotedString(s) => s
                .parse()
                .map_err(|e| SqlError::Parse(format!("bad number {s}: {e}"))),
            _ => Err(SqlError::Parse(format!("expected number, got {value}"))),
        }
    } else if let Expr::UnaryOp {
        op: ast::UnaryOperator::Minus,
        expr,
    } = expr
    {
        Ok(-parse_f64(expr)?)
    } else {
        Err(SqlError::Parse(format!("expected value, got {expr}")))
    }
}

/// `YYYY-MM-DD`, or an RFC 3339 timestamp truncated to its date.
fn parse_date(expr: &Expr) -> Result<NaiveDate, SqlError> {
    let s = parse_string(expr)?;
    NaiveDate::parse_from_str(&s, "%Y-%m-%d")
        .or_else(|_| DateTime::parse_from_rfc3339(&s).map(|dt| dt.date_naive()))
        .map_err(|e| SqlError::Parse(format!("bad date {s}: {e}")))
}

// ── Errors ────────────────────────────────────────────────────

#[derive(Debug)]
pub enum SqlError {
    Parse(String),
    Empty,
    Unsupported(String),
    UnknownTable(String),
    WrongArity(&'static str, usize, usize),
    MissingFilter(&'static str),
    InvalidPeriod {
        pickup_date: NaiveDate,
        return_date: NaiveDate,
    },
}

impl std::fmt::Display for SqlError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SqlError::Parse(s) => write!(f, "parse error: {s}"),
            SqlError::Empty => write!(f, "empty query"),
            SqlError::Unsupported(s) => write!(f, "unsupported: {s}"),
            SqlError::UnknownTable(t) => write!(f, "unknown table: {t}"),
            SqlError::WrongArity(t, expected, got) => {
                write!(f, "{t}: expected {expected} values, got {got}")
            }
            SqlError::MissingFilter(col) => write!(f, "missing filter: {col}"),
            SqlError::InvalidPeriod {
                pickup_date,
                return_date,
            } => write!(
                f,
                "pickup date {pickup_date} is after return date {return_date}"
            ),
        }
    }
}

impl std::error::Error for SqlError {}
