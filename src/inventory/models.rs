use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel::pg::upsert::excluded;

use crate::db;
use crate::errors::ServiceError;
use crate::inventory::import::ArticleRow;
use crate::schema::articles;
use crate::validator;

/// postgres accepts at most 65535 bind parameters per statement
const MAX_BIND_PARAMS: usize = 65_535;
/// bound values per `NewArticle`
const ARTICLE_COLUMNS: usize = 6;
const UPSERT_CHUNK_SIZE: usize = 1_000;

/// An item a club keeps in stock: balls, rackets, drinks, ...
#[derive(Debug, Clone, Serialize, Queryable, Identifiable)]
pub struct Article {
    pub id: i64,
    pub club_id: i64,
    /// unique per club, used to match spreadsheet rows
    pub code: String,
    pub name: String,
    pub category: Option<String>,
    pub quantity: i32,
    /// price in cents
    pub price: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// **POST /api/inventory/articles**
#[derive(Debug, Clone, Deserialize)]
pub struct CreateArticle {
    pub code: String,
    pub name: String,
    pub category: Option<String>,
    #[serde(default)]
    pub quantity: i32,
    #[serde(default)]
    pub price: i64,
}

#[derive(Debug, Insertable)]
#[table_name = "articles"]
struct NewArticle {
    club_id: i64,
    code: String,
    name: String,
    category: Option<String>,
    quantity: i32,
    price: i64,
}

/// **PATCH /api/inventory/articles/{id}**
#[derive(Debug, Deserialize, AsChangeset)]
#[table_name = "articles"]
pub struct UpdateArticle {
    pub code: Option<String>,
    pub name: Option<String>,
    pub category: Option<String>,
    pub quantity: Option<i32>,
    pub price: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct ArticleFilter {
    /// filter articles by %name% or %code%
    pub search: Option<String>,
    pub category: Option<String>,
}

impl Article {
    pub fn create(article: &CreateArticle, club_id: i64, conn: &db::Conn) -> Result<Article, ServiceError> {
        let article = diesel::insert_into(articles::table)
            .values(&NewArticle {
                club_id,
                code: article.code.trim().to_string(),
                name: article.name.trim().to_string(),
                category: article.category.clone(),
                quantity: article.quantity,
                price: article.price,
            })
            .get_result::<Article>(conn)?;

        Ok(article)
    }

    /// find an article of this club, articles of other clubs are NotFound
    pub fn find(id: i64, club_id: i64, conn: &db::Conn) -> Result<Article, ServiceError> {
        let article = articles::table
            .find(id)
            .filter(articles::club_id.eq(club_id))
            .first::<Article>(conn)?;

        Ok(article)
    }

    pub fn find_all(
        club_id: i64,
        filter: ArticleFilter,
        conn: &db::Conn,
    ) -> Result<Vec<Article>, ServiceError> {
        let mut query = articles::table
            .filter(articles::club_id.eq(club_id))
            .order(articles::code)
            .into_boxed();

        if let Some(search) = filter.search {
            let pattern = format!("%{}%", search);
            query = query.filter(
                articles::name
                    .ilike(pattern.clone())
                    .or(articles::code.ilike(pattern)),
            );
        }

        if let Some(category) = filter.category {
            query = query.filter(articles::category.eq(category));
        }

        let articles = query.load::<Article>(conn)?;
        Ok(articles)
    }

    pub fn update(
        id: i64,
        club_id: i64,
        update: &UpdateArticle,
        conn: &db::Conn,
    ) -> Result<Article, ServiceError> {
        Article::find(id, club_id, conn)?;

        let article = diesel::update(articles::table.find(id))
            .set((update, articles::updated_at.eq(Utc::now())))
            .get_result::<Article>(conn)?;

        Ok(article)
    }

    pub fn delete(id: i64, club_id: i64, conn: &db::Conn) -> Result<(), ServiceError> {
        let deleted = diesel::delete(
            articles::table
                .find(id)
                .filter(articles::club_id.eq(club_id)),
        )
        .execute(conn)?;

        if deleted == 0 {
            return Err(ServiceError::NotFound);
        }

        Ok(())
    }

    /// Inserts the rows, or updates the article when the club already
    /// has one with the same code. The rows must have unique codes.
    #[tracing::instrument(name = "inventory::upsert", skip(rows, conn))]
    pub fn upsert_all(
        club_id: i64,
        rows: Vec<ArticleRow>,
        conn: &db::Conn,
    ) -> Result<usize, ServiceError> {
        if rows.is_empty() {
            return Ok(0);
        }

        let new_articles: Vec<NewArticle> = rows
            .into_iter()
            .map(|row| NewArticle {
                club_id,
                code: row.code,
                name: row.name,
                category: row.category,
                quantity: row.quantity,
                price: row.price,
            })
            .collect();

        let mut upserted = 0;
        for chunk in new_articles.chunks(UPSERT_CHUNK_SIZE) {
            upserted += diesel::insert_into(articles::table)
                .values(chunk)
                .on_conflict((articles::club_id, articles::code))
                .do_update()
                .set((
                    articles::name.eq(excluded(articles::name)),
                    articles::category.eq(excluded(articles::category)),
                    articles::quantity.eq(excluded(articles::quantity)),
                    articles::price.eq(excluded(articles::price)),
                    articles::updated_at.eq(Utc::now()),
                ))
                .execute(conn)?;
        }

        Ok(upserted)
    }
}

fn validate_stock(quantity: Option<i32>, price: Option<i64>) -> Result<(), ServiceError> {
    if quantity.map_or(false, |quantity| quantity < 0) {
        bad_request!("the quantity can't be negative");
    }

    if price.map_or(false, |price| price < 0) {
        bad_request!("the price can't be negative");
    }

    Ok(())
}

impl crate::validator::Validate<CreateArticle> for CreateArticle {
    fn validate(&self) -> Result<(), ServiceError> {
        if self.code.trim().is_empty() {
            bad_request!("an article needs a code");
        }

        validator::name(&self.name)?;
        validate_stock(Some(self.quantity), Some(self.price))
    }
}

impl crate::validator::Validate<UpdateArticle> for UpdateArticle {
    fn validate(&self) -> Result<(), ServiceError> {
        if let Some(code) = &self.code {
            if code.trim().is_empty() {
                bad_request!("an article needs a code");
            }
        }

        if let Some(name) = &self.name {
            validator::name(name)?;
        }

        validate_stock(self.quantity, self.price)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validator::Validator;

    fn article() -> CreateArticle {
        CreateArticle {
            code: String::from("BALL-3"),
            name: String::from("Tube of 3 balls"),
            category: Some(String::from("balls")),
            quantity: 24,
            price: 650,
        }
    }

    #[test]
    fn valid_article() {
        assert!(Validator::new(article()).validate().is_ok());
    }

    #[test]
    fn invalid_articles() {
        let mut no_code = article();
        no_code.code = String::from("  ");
        assert!(Validator::new(no_code).validate().is_err());

        let mut negative = article();
        negative.quantity = -1;
        assert!(Validator::new(negative).validate().is_err());

        let update = UpdateArticle {
            code: None,
            name: None,
            category: None,
            quantity: None,
            price: Some(-5),
        };
        assert!(Validator::new(update).validate().is_err());
    }

    #[test]
    fn upsert_chunks_stay_under_the_bind_limit() {
        // one extra parameter for updated_at
        assert!(UPSERT_CHUNK_SIZE * ARTICLE_COLUMNS + 1 < MAX_BIND_PARAMS);

        let rows: Vec<NewArticle> = (0..12_000)
            .map(|n| NewArticle {
                club_id: 1,
                code: format!("ART-{}", n),
                name: format!("article {}", n),
                category: None,
                quantity: 1,
                price: 100,
            })
            .collect();

        let chunks: Vec<usize> = rows.chunks(UPSERT_CHUNK_SIZE).map(|chunk| chunk.len()).collect();
        assert_eq!(chunks.len(), 12);
        assert!(chunks.iter().all(|len| len * ARTICLE_COLUMNS < MAX_BIND_PARAMS));
        assert_eq!(chunks.iter().sum::<usize>(), 12_000);
    }
}
