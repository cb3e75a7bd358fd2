use chrono::{DateTime, NaiveDate, Utc};
use diesel::prelude::*;

use crate::db;
use crate::errors::ServiceError;
use crate::schema::movements;
use crate::spreadsheet::{self, Cell};

/// 10 billion in cents, keeps any realistic total far from i64::MAX
pub const MAX_AMOUNT: i64 = 1_000_000_000_000;

pub const EXPORT_HEADER: [&str; 4] = ["date", "kind", "description", "amount"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum MovementKind {
    Income,
    Expense,
}

impl std::fmt::Display for MovementKind {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            MovementKind::Income => write!(f, "INCOME"),
            MovementKind::Expense => write!(f, "EXPENSE"),
        }
    }
}

/// Money coming in or going out of a club
#[derive(Debug, Clone, Serialize, Queryable, Identifiable)]
pub struct Movement {
    pub id: i64,
    pub club_id: i64,
    pub kind: String,
    /// always positive, in cents, the kind tells the direction
    pub amount: i64,
    pub description: String,
    pub occurred_on: NaiveDate,
    pub created_at: DateTime<Utc>,
}

/// **POST /api/finance/movements**
#[derive(Debug, Clone, Deserialize)]
pub struct CreateMovement {
    pub kind: MovementKind,
    pub amount: i64,
    pub description: String,
    pub occurred_on: NaiveDate,
}

#[derive(Insertable)]
#[table_name = "movements"]
struct NewMovement<'a> {
    club_id: i64,
    kind: String,
    amount: i64,
    description: &'a str,
    occurred_on: NaiveDate,
}

/// **PATCH /api/finance/movements/{id}**
#[derive(Debug, Deserialize)]
pub struct UpdateMovement {
    pub kind: Option<MovementKind>,
    pub amount: Option<i64>,
    pub description: Option<String>,
    pub occurred_on: Option<NaiveDate>,
}

#[derive(AsChangeset)]
#[table_name = "movements"]
struct MovementChangeset {
    kind: Option<String>,
    amount: Option<i64>,
    description: Option<String>,
    occurred_on: Option<NaiveDate>,
}

/// both dates are inclusive
#[derive(Debug, Default, Deserialize)]
pub struct MovementFilter {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    pub kind: Option<MovementKind>,
}

/// **GET /api/finance/summary**
#[derive(Debug, PartialEq, Serialize)]
pub struct Summary {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    pub income: i64,
    pub expense: i64,
    pub balance: i64,
}

impl Summary {
    pub fn of(movements: &[Movement], from: Option<NaiveDate>, to: Option<NaiveDate>) -> Summary {
        let total = |kind: MovementKind| -> i64 {
            movements
                .iter()
                .filter(|movement| movement.kind == kind.to_string())
                .fold(0i64, |total, movement| total.saturating_add(movement.amount))
        };

        let income = total(MovementKind::Income);
        let expense = total(MovementKind::Expense);

        Summary {
            from,
            to,
            income,
            expense,
            balance: income.saturating_sub(expense),
        }
    }
}

impl Movement {
    pub fn create(
        movement: &CreateMovement,
        club_id: i64,
        conn: &db::Conn,
    ) -> Result<Movement, ServiceError> {
        let movement = diesel::insert_into(movements::table)
            .values(&NewMovement {
                club_id,
                kind: movement.kind.to_string(),
                amount: movement.amount,
                description: movement.description.trim(),
                occurred_on: movement.occurred_on,
            })
            .get_result::<Movement>(conn)?;

        Ok(movement)
    }

    /// find a movement of this club, movements of other clubs are NotFound
    pub fn find(id: i64, club_id: i64, conn: &db::Conn) -> Result<Movement, ServiceError> {
        let movement = movements::table
            .find(id)
            .filter(movements::club_id.eq(club_id))
            .first::<Movement>(conn)?;

        Ok(movement)
    }

    pub fn find_all(
        club_id: i64,
        filter: &MovementFilter,
        conn: &db::Conn,
    ) -> Result<Vec<Movement>, ServiceError> {
        let mut query = movements::table
            .filter(movements::club_id.eq(club_id))
            .order((movements::occurred_on, movements::id))
            .into_boxed();

        if let Some(from) = filter.from {
            query = query.filter(movements::occurred_on.ge(from));
        }

        if let Some(to) = filter.to {
            query = query.filter(movements::occurred_on.le(to));
        }

        if let Some(kind) = filter.kind {
            query = query.filter(movements::kind.eq(kind.to_string()));
        }

        let movements = query.load::<Movement>(conn)?;
        Ok(movements)
    }

    pub fn summary(
        club_id: i64,
        from: Option<NaiveDate>,
        to: Option<NaiveDate>,
        conn: &db::Conn,
    ) -> Result<Summary, ServiceError> {
        let filter = MovementFilter {
            from,
            to,
            kind: None,
        };
        let movements = Movement::find_all(club_id, &filter, conn)?;

        Ok(Summary::of(&movements, from, to))
    }

    pub fn update(
        id: i64,
        club_id: i64,
        update: UpdateMovement,
        conn: &db::Conn,
    ) -> Result<Movement, ServiceError> {
        Movement::find(id, club_id, conn)?;

        let changes = MovementChangeset {
            kind: update.kind.map(|kind| kind.to_string()),
            amount: update.amount,
            description: update.description.map(|description| description.trim().to_string()),
            occurred_on: update.occurred_on,
        };

        let movement = diesel::update(movements::table.find(id))
            .set(&changes)
            .get_result::<Movement>(conn)?;

        Ok(movement)
    }

    pub fn delete(id: i64, club_id: i64, conn: &db::Conn) -> Result<(), ServiceError> {
        let deleted = diesel::delete(
            movements::table
                .find(id)
                .filter(movements::club_id.eq(club_id)),
        )
        .execute(conn)?;

        if deleted == 0 {
            return Err(ServiceError::NotFound);
        }

        Ok(())
    }
}

/// the export rows, amounts in units instead of cents
pub fn export_rows(movements: &[Movement]) -> Vec<Vec<Cell>> {
    movements
        .iter()
        .map(|movement| {
            vec![
                Cell::Text(movement.occurred_on.format("%Y-%m-%d").to_string()),
                Cell::Text(movement.kind.clone()),
                Cell::Text(movement.description.clone()),
                Cell::Number(spreadsheet::from_cents(movement.amount)),
            ]
        })
        .collect()
}

fn validate_amount(amount: i64) -> Result<(), ServiceError> {
    if amount <= 0 {
        bad_request!("the amount has to be positive");
    }

    if amount > MAX_AMOUNT {
        bad_request!("the amount is too large");
    }

    Ok(())
}

fn validate_description(description: &str) -> Result<(), ServiceError> {
    if description.trim().is_empty() {
        bad_request!("a movement needs a description");
    }

    if description.trim().chars().count() > 255 {
        bad_request!("the description is too long, maximum 255 characters");
    }

    Ok(())
}

impl crate::validator::Validate<CreateMovement> for CreateMovement {
    fn validate(&self) -> Result<(), ServiceError> {
        validate_amount(self.amount)?;
        validate_description(&self.description)
    }
}

impl crate::validator::Validate<UpdateMovement> for UpdateMovement {
    fn validate(&self) -> Result<(), ServiceError> {
        if let Some(amount) = self.amount {
            validate_amount(amount)?;
        }

        if let Some(description) = &self.description {
            validate_description(description)?;
        }

        if self.kind.is_none()
            && self.amount.is_none()
            && self.description.is_none()
            && self.occurred_on.is_none()
        {
            bad_request!("nothing to update");
        }

        Ok(())
    }
}

impl crate::validator::Validate<MovementFilter> for MovementFilter {
    fn validate(&self) -> Result<(), ServiceError> {
        if let (Some(from), Some(to)) = (self.from, self.to) {
            if from > to {
                bad_request!("the start of the range has to be before its end");
            }
        }

        Ok(())
    }
}
