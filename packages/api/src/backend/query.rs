//! Table queries in the shape the REST backend understands.
//!
//! A [`Query`] renders to PostgREST parameters:
//!
//! ```text
//! select=*,author:profiles!author_id(full_name)
//! status=eq.published
//! order=created_at.desc
//! ```
//!
//! The in-memory backend evaluates the same structure directly.

use super::Table;

/// Test applied to one column.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Condition {
    Eq(String),
    IsNull,
}

/// Row filter on one column.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Filter {
    pub column: &'static str,
    pub condition: Condition,
}

pub fn eq(column: &'static str, value: impl ToString) -> Filter {
    Filter {
        column,
        condition: Condition::Eq(value.to_string()),
    }
}

/// Matches rows where `column` is SQL `NULL`. Used to make a write
/// conditional on nobody having filled the column first.
pub fn is_null(column: &'static str) -> Filter {
    Filter {
        column,
        condition: Condition::IsNull,
    }
}

impl Filter {
    pub fn to_param(&self) -> (String, String) {
        let value = match &self.condition {
            Condition::Eq(value) => format!("eq.{}", value),
            Condition::IsNull => "is.null".to_string(),
        };
        (self.column.to_string(), value)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction {
    Asc,
    Desc,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OrderBy {
    pub column: &'static str,
    pub direction: Direction,
}

/// A related row pulled in through a foreign key, exposed under `alias`.
/// Every embed targets the related table's `id`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Embed {
    pub alias: &'static str,
    pub table: Table,
    pub foreign_key: &'static str,
    pub columns: &'static [&'static str],
}

impl Embed {
    /// `full_name` of the profile referenced by `foreign_key`.
    pub fn profile_name(alias: &'static str, foreign_key: &'static str) -> Self {
        Self {
            alias,
            table: Table::Profiles,
            foreign_key,
            columns: &["full_name"],
        }
    }

    fn to_select(&self) -> String {
        format!(
            "{}:{}!{}({})",
            self.alias,
            self.table.name(),
            self.foreign_key,
            self.columns.join(",")
        )
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Query {
    pub filters: Vec<Filter>,
    pub order: Vec<OrderBy>,
    pub embeds: Vec<Embed>,
    pub limit: Option<usize>,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn eq(mut self, column: &'static str, value: impl ToString) -> Self {
        self.filters.push(eq(column, value));
        self
    }

    pub fn order_asc(mut self, column: &'static str) -> Self {
        self.order.push(OrderBy {
            column,
            direction: Direction::Asc,
        });
        self
    }

    pub fn order_desc(mut self, column: &'static str) -> Self {
        self.order.push(OrderBy {
            column,
            direction: Direction::Desc,
        });
        self
    }

    pub fn embed(mut self, embed: Embed) -> Self {
        self.embeds.push(embed);
        self
    }

    pub fn limit(mut self, n: usize) -> Self {
        self.limit = Some(n);
        self
    }

    pub fn select_clause(&self) -> String {
        std::iter::once("*".to_string())
            .chain(self.embeds.iter().map(Embed::to_select))
            .collect::<Vec<_>>()
            .join(",")
    }

    /// Query-string parameters for `GET /rest/v1/{table}`.
    pub fn to_params(&self) -> Vec<(String, String)> {
        let mut params = vec![("select".to_string(), self.select_clause())];
        params.extend(self.filters.iter().map(Filter::to_param));
        if !self.order.is_empty() {
            let order = self
                .order
                .iter()
                .map(|o| {
                    let dir = match o.direction {
                        Direction::Asc => "asc",
                        Direction::Desc => "desc",
                    };
                    format!("{}.{}", o.column, dir)
                })
                .collect::<Vec<_>>()
                .join(",");
            params.push(("order".to_string(), order));
        }
        if let Some(n) = self.limit {
            params.push(("limit".to_string(), n.to_string()));
        }
        params
    }
}
