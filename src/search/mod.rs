//! Search filter for administrative user listings.
//!
//! Each criterion is optional. Present criteria are combined with AND:
//! identifiers, timestamps and flags by exact equality, names and email by
//! case-sensitive substring.

use chrono::NaiveDateTime;
use sea_orm::sea_query::{Alias, Expr, Func, SimpleExpr};
use sea_orm::{ColumnTrait, Condition};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::SEARCH_DATE_FORMATS;
use crate::entities::users;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum FilterError {
    #[error("Invalid date for {field}: '{value}'. Use YYYY-MM-DD, YYYY-MM-DD HH:MM or YYYY-MM-DD HH:MM:SS")]
    InvalidDate { field: &'static str, value: String },
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SearchFilter {
    pub id: Option<i32>,
    pub created_on: Option<String>,
    pub updated_on: Option<String>,
    pub last_visit_on: Option<String>,
    pub email_verified: Option<bool>,
    pub is_active: Option<bool>,
    pub is_disabled: Option<bool>,
    pub username: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
}

impl SearchFilter {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Applies form-input rules: trim every string, then drop empty ones.
    #[must_use]
    pub fn normalized(self) -> Self {
        fn clean(value: Option<String>) -> Option<String> {
            value
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        }

        Self {
            created_on: clean(self.created_on),
            updated_on: clean(self.updated_on),
            last_visit_on: clean(self.last_visit_on),
            username: clean(self.username),
            first_name: clean(self.first_name),
            last_name: clean(self.last_name),
            email: clean(self.email),
            ..self
        }
    }

    pub fn validate(&self) -> Result<(), FilterError> {
        let dates = [
            ("createdOn", &self.created_on),
            ("updatedOn", &self.updated_on),
            ("lastVisitOn", &self.last_visit_on),
        ];

        for (field, value) in dates {
            match value {
                Some(value) if !is_search_date(value) => {
                    return Err(FilterError::InvalidDate {
                        field,
                        value: value.clone(),
                    });
                }
                _ => {}
            }
        }

        Ok(())
    }

    /// Conjunction of every present criterion. An empty filter yields an
    /// empty conjunction, which matches all rows.
    #[must_use]
    pub fn to_condition(&self) -> Condition {
        let mut condition = Condition::all();

        if let Some(id) = self.id {
            condition = condition.add(users::Column::Id.eq(id));
        }
        if let Some(created_on) = &self.created_on {
            condition = condition.add(users::Column::CreatedOn.eq(created_on.as_str()));
        }
        if let Some(updated_on) = &self.updated_on {
            condition = condition.add(users::Column::UpdatedOn.eq(updated_on.as_str()));
        }
        if let Some(last_visit_on) = &self.last_visit_on {
            condition = condition.add(users::Column::LastVisitOn.eq(last_visit_on.as_str()));
        }
        if let Some(email_verified) = self.email_verified {
            condition = condition.add(users::Column::EmailVerified.eq(email_verified));
        }
        if let Some(is_active) = self.is_active {
            condition = condition.add(users::Column::IsActive.eq(is_active));
        }
        if let Some(is_disabled) = self.is_disabled {
            condition = condition.add(users::Column::IsDisabled.eq(is_disabled));
        }

        let substrings = [
            (users::Column::Username, &self.username),
            (users::Column::Firstname, &self.first_name),
            (users::Column::Lastname, &self.last_name),
            (users::Column::Email, &self.email),
        ];
        for (column, needle) in substrings {
            if let Some(needle) = needle {
                condition = condition.add(contains(column, needle));
            }
        }

        condition
    }
}

/// `instr(column, needle) > 0`: SQLite's LIKE folds ASCII case and treats
/// `%`/`_` as wildcards, instr does neither.
fn contains(column: users::Column, needle: &str) -> SimpleExpr {
    Expr::expr(
        Func::cust(Alias::new("instr"))
            .arg(Expr::col((users::Entity, column)))
            .arg(needle.to_string()),
    )
    .gt(0)
}

fn is_search_date(value: &str) -> bool {
    SEARCH_DATE_FORMATS.iter().any(|format| {
        NaiveDateTime::parse_from_str(value, format).is_ok()
            || chrono::NaiveDate::parse_from_str(value, format).is_ok()
    })
}
