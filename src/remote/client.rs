//! HTTP implementation of [`RemoteStore`] against a LeanCloud-class
//! REST object store: `/1.1/classes/{Class}` with JSON `where`
//! predicates, `order`, `limit`/`skip`, and `__op` field operations for
//! atomic increments.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::{json, Value};

use super::store::*;
use crate::questions::{
    Category, CategoryDraft, Difficulty, FieldPatch, Proficiency, Question, QuestionDraft,
};

/// Connection settings for the remote object store
#[derive(Debug, Clone)]
pub struct RemoteConfig {
    /// e.g. `https://api.example.com`
    pub base_url: String,
    pub app_id: String,
    pub app_key: String,
}

pub struct HttpRemoteStore {
    client: Client,
    config: RemoteConfig,
}

const QUESTION_CLASS: &str = "Question";
const CATEGORY_CLASS: &str = "Category";

impl HttpRemoteStore {
    pub fn new(config: RemoteConfig) -> Result<Self> {
        let config = RemoteConfig {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            ..config
        };

        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .connect_timeout(std::time::Duration::from_secs(10))
            .build()?;

        Ok(Self { client, config })
    }

    fn class_url(&self, class: &str) -> String {
        format!("{}/1.1/classes/{}", self.config.base_url, class)
    }

    fn object_url(&self, class: &str, id: &str) -> String {
        format!("{}/1.1/classes/{}/{}", self.config.base_url, class, id)
    }

    fn request(&self, builder: reqwest::RequestBuilder, session: &Session) -> reqwest::RequestBuilder {
        builder
            .header("X-LC-Id", &self.config.app_id)
            .header("X-LC-Key", &self.config.app_key)
            .header("X-LC-Session", &session.session_token)
    }

    /// Translate a non-success status into the error taxonomy
    async fn check_status(response: reqwest::Response, context: &str) -> Result<reqwest::Response> {
        match response.status() {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(RemoteError::AuthFailed),
            StatusCode::NOT_FOUND => Err(RemoteError::NotFound(context.to_string())),
            StatusCode::TOO_MANY_REQUESTS => Err(RemoteError::RateLimited),
            status if !status.is_success() => Err(RemoteError::Server {
                status: status.as_u16(),
                message: response.text().await.unwrap_or_default(),
            }),
            _ => Ok(response),
        }
    }

    fn map_reqwest(e: reqwest::Error) -> RemoteError {
        if e.is_timeout() {
            RemoteError::Timeout
        } else if e.is_connect() {
            RemoteError::Network(e.to_string())
        } else {
            RemoteError::Http(e)
        }
    }

    /// Build the `where` predicate for a question query, always scoped
    /// to the session user
    fn where_clause(session: &Session, query: &QuestionQuery) -> Value {
        let mut clause = json!({ "createdBy": session.user_id });
        let obj = clause.as_object_mut().expect("where clause is an object");

        match &query.category {
            Some(CategoryFilter::Id(id)) => {
                obj.insert("categoryId".to_string(), json!(id));
            }
            Some(CategoryFilter::Uncategorized) => {
                obj.insert("categoryId".to_string(), json!({ "$exists": false }));
            }
            None => {}
        }
        if let Some(difficulty) = query.filters.difficulty {
            obj.insert("difficulty".to_string(), json!(difficulty));
        }
        if let Some(proficiency) = query.filters.proficiency {
            obj.insert("proficiency".to_string(), json!(proficiency));
        }
        if let Some(tag) = &query.filters.tag {
            // Equality on an array column matches membership
            obj.insert("tags".to_string(), json!(tag));
        }

        clause
    }

    fn order_param(sort: &Sort) -> String {
        let field = match sort.field {
            SortField::CreatedAt => "createdAt",
            SortField::UpdatedAt => "updatedAt",
            SortField::LastReviewedAt => "lastReviewedAt",
            SortField::AppearanceLevel => "appearanceLevel",
            SortField::Title => "title",
        };
        match sort.direction {
            SortDirection::Ascending => field.to_string(),
            SortDirection::Descending => format!("-{}", field),
        }
    }

    /// JSON body for a single-field update
    fn patch_body(patch: &FieldPatch) -> Value {
        match patch {
            FieldPatch::AppearanceLevel(level) => json!({ "appearanceLevel": level }),
            FieldPatch::LastReviewedAt(Some(at)) => json!({ "lastReviewedAt": at }),
            FieldPatch::LastReviewedAt(None) => {
                json!({ "lastReviewedAt": { "__op": "Delete" } })
            }
            FieldPatch::Difficulty(d) => json!({ "difficulty": d }),
            FieldPatch::Proficiency(p) => json!({ "proficiency": p }),
            FieldPatch::Category(Some(id)) => json!({ "categoryId": id }),
            FieldPatch::Category(None) => json!({ "categoryId": { "__op": "Delete" } }),
        }
    }
}

/// Question record as the store returns it (`objectId` instead of `id`)
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiQuestion {
    object_id: String,
    title: String,
    #[serde(default)]
    detailed_answer: Option<String>,
    #[serde(default)]
    oral_answer: Option<String>,
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    reference_url: Option<String>,
    #[serde(default)]
    tags: Vec<String>,
    #[serde(default)]
    difficulty: Difficulty,
    #[serde(default)]
    proficiency: Proficiency,
    #[serde(default = "default_appearance_level")]
    appearance_level: u8,
    #[serde(default)]
    last_reviewed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    category_id: Option<String>,
    created_by: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

fn default_appearance_level() -> u8 {
    crate::questions::DEFAULT_APPEARANCE_LEVEL
}

impl ApiQuestion {
    fn into_question(self) -> Question {
        Question {
            id: self.object_id,
            title: self.title,
            detailed_answer: self.detailed_answer,
            oral_answer: self.oral_answer,
            code: self.code,
            reference_url: self.reference_url,
            tags: self.tags,
            difficulty: self.difficulty,
            proficiency: self.proficiency,
            appearance_level: self.appearance_level,
            last_reviewed_at: self.last_reviewed_at,
            category_id: self.category_id,
            created_by: self.created_by,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
        .normalize()
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiCategory {
    object_id: String,
    name: String,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    question_count: i64,
    created_by: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl ApiCategory {
    fn into_category(self) -> Category {
        Category {
            id: self.object_id,
            name: self.name,
            description: self.description,
            question_count: self.question_count,
            created_by: self.created_by,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ListResponse<T> {
    results: Vec<T>,
    #[serde(default)]
    count: Option<usize>,
}

#[async_trait]
impl RemoteStore for HttpRemoteStore {
    async fn fetch_questions(
        &self,
        session: &Session,
        query: &QuestionQuery,
    ) -> Result<Vec<Question>> {
        let where_clause = Self::where_clause(session, query);
        let mut request = self
            .request(self.client.get(self.class_url(QUESTION_CLASS)), session)
            .query(&[
                ("where", where_clause.to_string()),
                ("order", Self::order_param(&query.sort)),
            ]);
        if let Some(limit) = query.limit {
            request = request.query(&[("limit", limit.to_string())]);
        }
        if let Some(skip) = query.skip {
            request = request.query(&[("skip", skip.to_string())]);
        }

        let response = request.send().await.map_err(Self::map_reqwest)?;
        let response = Self::check_status(response, "question list").await?;

        let body: ListResponse<ApiQuestion> =
            response.json().await.map_err(Self::map_reqwest)?;
        Ok(body
            .results
            .into_iter()
            .map(ApiQuestion::into_question)
            .collect())
    }

    async fn count_questions(&self, session: &Session, query: &QuestionQuery) -> Result<usize> {
        let where_clause = Self::where_clause(session, query);
        let response = self
            .request(self.client.get(self.class_url(QUESTION_CLASS)), session)
            .query(&[
                ("where", where_clause.to_string()),
                ("count", "1".to_string()),
                ("limit", "0".to_string()),
            ])
            .send()
            .await
            .map_err(Self::map_reqwest)?;
        let response = Self::check_status(response, "question count").await?;

        let body: ListResponse<ApiQuestion> =
            response.json().await.map_err(Self::map_reqwest)?;
        body.count
            .ok_or_else(|| RemoteError::Malformed("missing count in response".to_string()))
    }

    async fn get_question(&self, session: &Session, id: &str) -> Result<Question> {
        let response = self
            .request(self.client.get(self.object_url(QUESTION_CLASS, id)), session)
            .send()
            .await
            .map_err(Self::map_reqwest)?;
        let response = Self::check_status(response, id).await?;

        let api: ApiQuestion = response.json().await.map_err(Self::map_reqwest)?;
        if api.created_by != session.user_id {
            // Ownership is enforced by the store's ACLs; treat a leak as
            // absent rather than exposing another user's record
            return Err(RemoteError::NotFound(id.to_string()));
        }
        Ok(api.into_question())
    }

    async fn create_question(&self, session: &Session, draft: &QuestionDraft) -> Result<Question> {
        let mut body = serde_json::to_value(draft)
            .map_err(|e| RemoteError::Malformed(e.to_string()))?;
        if let Some(obj) = body.as_object_mut() {
            obj.insert("createdBy".to_string(), json!(session.user_id));
        }

        let response = self
            .request(self.client.post(self.class_url(QUESTION_CLASS)), session)
            .query(&[("fetchWhenSave", "true")])
            .json(&body)
            .send()
            .await
            .map_err(Self::map_reqwest)?;
        let response = Self::check_status(response, "question create").await?;

        let api: ApiQuestion = response.json().await.map_err(Self::map_reqwest)?;
        Ok(api.into_question())
    }

    async fn update_question(
        &self,
        session: &Session,
        id: &str,
        draft: &QuestionDraft,
    ) -> Result<Question> {
        let response = self
            .request(self.client.put(self.object_url(QUESTION_CLASS, id)), session)
            .query(&[("fetchWhenSave", "true")])
            .json(draft)
            .send()
            .await
            .map_err(Self::map_reqwest)?;
        let response = Self::check_status(response, id).await?;

        let api: ApiQuestion = response.json().await.map_err(Self::map_reqwest)?;
        Ok(api.into_question())
    }

    async fn update_question_field(
        &self,
        session: &Session,
        id: &str,
        patch: &FieldPatch,
    ) -> Result<Question> {
        let response = self
            .request(self.client.put(self.object_url(QUESTION_CLASS, id)), session)
            .query(&[("fetchWhenSave", "true")])
            .json(&Self::patch_body(patch))
            .send()
            .await
            .map_err(Self::map_reqwest)?;
        let response = Self::check_status(response, id).await?;

        let api: ApiQuestion = response.json().await.map_err(Self::map_reqwest)?;
        Ok(api.into_question())
    }

    async fn delete_question(&self, session: &Session, id: &str) -> Result<()> {
        let response = self
            .request(
                self.client.delete(self.object_url(QUESTION_CLASS, id)),
                session,
            )
            .send()
            .await
            .map_err(Self::map_reqwest)?;
        Self::check_status(response, id).await?;
        Ok(())
    }

    async fn list_categories(&self, session: &Session) -> Result<Vec<Category>> {
        let where_clause = json!({ "createdBy": session.user_id });
        let response = self
            .request(self.client.get(self.class_url(CATEGORY_CLASS)), session)
            .query(&[
                ("where", where_clause.to_string()),
                ("order", "-createdAt".to_string()),
            ])
            .send()
            .await
            .map_err(Self::map_reqwest)?;
        let response = Self::check_status(response, "category list").await?;

        let body: ListResponse<ApiCategory> =
            response.json().await.map_err(Self::map_reqwest)?;
        Ok(body
            .results
            .into_iter()
            .map(ApiCategory::into_category)
            .collect())
    }

    async fn create_category(&self, session: &Session, draft: &CategoryDraft) -> Result<Category> {
        let mut body = serde_json::to_value(draft)
            .map_err(|e| RemoteError::Malformed(e.to_string()))?;
        if let Some(obj) = body.as_object_mut() {
            obj.insert("createdBy".to_string(), json!(session.user_id));
            obj.insert("questionCount".to_string(), json!(0));
        }

        let response = self
            .request(self.client.post(self.class_url(CATEGORY_CLASS)), session)
            .query(&[("fetchWhenSave", "true")])
            .json(&body)
            .send()
            .await
            .map_err(Self::map_reqwest)?;
        let response = Self::check_status(response, "category create").await?;

        let api: ApiCategory = response.json().await.map_err(Self::map_reqwest)?;
        Ok(api.into_category())
    }

    async fn update_category(
        &self,
        session: &Session,
        id: &str,
        draft: &CategoryDraft,
    ) -> Result<Category> {
        let response = self
            .request(self.client.put(self.object_url(CATEGORY_CLASS, id)), session)
            .query(&[("fetchWhenSave", "true")])
            .json(draft)
            .send()
            .await
            .map_err(Self::map_reqwest)?;
        let response = Self::check_status(response, id).await?;

        let api: ApiCategory = response.json().await.map_err(Self::map_reqwest)?;
        Ok(api.into_category())
    }

    async fn delete_category(&self, session: &Session, id: &str) -> Result<()> {
        let response = self
            .request(
                self.client.delete(self.object_url(CATEGORY_CLASS, id)),
                session,
            )
            .send()
            .await
            .map_err(Self::map_reqwest)?;
        Self::check_status(response, id).await?;
        Ok(())
    }

    async fn increment_question_count(
        &self,
        session: &Session,
        category_id: &str,
        delta: i64,
    ) -> Result<()> {
        let body = json!({
            "questionCount": { "__op": "Increment", "amount": delta }
        });
        let response = self
            .request(
                self.client.put(self.object_url(CATEGORY_CLASS, category_id)),
                session,
            )
            .json(&body)
            .send()
            .await
            .map_err(Self::map_reqwest)?;
        Self::check_status(response, category_id).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session() -> Session {
        Session {
            user_id: "user-1".to_string(),
            session_token: "tok".to_string(),
        }
    }

    #[test]
    fn test_where_clause_scopes_to_user() {
        let clause = HttpRemoteStore::where_clause(&session(), &QuestionQuery::default());
        assert_eq!(clause["createdBy"], "user-1");
    }

    #[test]
    fn test_where_clause_filters() {
        let query = QuestionQuery {
            category: Some(CategoryFilter::Id("cat-1".to_string())),
            filters: QuestionFilters {
                difficulty: Some(Difficulty::Hard),
                proficiency: None,
                tag: Some("rust".to_string()),
            },
            ..Default::default()
        };
        let clause = HttpRemoteStore::where_clause(&session(), &query);
        assert_eq!(clause["categoryId"], "cat-1");
        assert_eq!(clause["difficulty"], "hard");
        assert_eq!(clause["tags"], "rust");
    }

    #[test]
    fn test_where_clause_uncategorized() {
        let query = QuestionQuery {
            category: Some(CategoryFilter::Uncategorized),
            ..Default::default()
        };
        let clause = HttpRemoteStore::where_clause(&session(), &query);
        assert_eq!(clause["categoryId"]["$exists"], false);
    }

    #[test]
    fn test_order_param() {
        let sort = Sort {
            field: SortField::AppearanceLevel,
            direction: SortDirection::Descending,
        };
        assert_eq!(HttpRemoteStore::order_param(&sort), "-appearanceLevel");

        let sort = Sort {
            field: SortField::Title,
            direction: SortDirection::Ascending,
        };
        assert_eq!(HttpRemoteStore::order_param(&sort), "title");
    }

    #[test]
    fn test_patch_body_delete_op_for_cleared_fields() {
        let body = HttpRemoteStore::patch_body(&FieldPatch::Category(None));
        assert_eq!(body["categoryId"]["__op"], "Delete");

        let body = HttpRemoteStore::patch_body(&FieldPatch::AppearanceLevel(60));
        assert_eq!(body["appearanceLevel"], 60);
    }
}
