/// Conversational recommendation sessions
///
/// Owns the per-session state machine: starting a conversation, refining
/// it with follow-up prompts, recording likes and exclusions, and keeping
/// the visible working set consistent with them. All session mutation
/// happens here, under the store's per-key lock, so a session's
/// operations apply in the order the client issues them.
///
/// Merge policy: a follow-up prompt replaces the working set wholesale,
/// while exclude/like refills append to it. The asymmetry is inherited
/// product behavior, kept as-is and pinned by tests.
use std::sync::Arc;

use crate::{
    error::{AppError, AppResult},
    models::{Recommendation, Session},
    services::{
        aggregator::RecommendationAggregator,
        session_store::{SessionStore, SessionUpdate},
    },
};

/// Working-set size below which an exclusion triggers a backfill
const MIN_VISIBLE_RECOMMENDATIONS: usize = 3;

pub struct ConversationService {
    store: Arc<dyn SessionStore>,
    aggregator: Arc<RecommendationAggregator>,
}

impl ConversationService {
    pub fn new(store: Arc<dyn SessionStore>, aggregator: Arc<RecommendationAggregator>) -> Self {
        Self { store, aggregator }
    }

    /// Starts a new conversation from a single prompt
    pub async fn start(&self, prompt: String) -> AppResult<Session> {
        let mut session = Session::new(prompt);

        let recommendations = self
            .aggregator
            .recommend_movies(&session.active_criteria)
            .await?;
        session.remember_titles(&recommendations);
        session.current_recommendations = recommendations;

        tracing::info!(
            session_id = %session.session_id,
            results = session.current_recommendations.len(),
            "Conversation started"
        );

        self.store.insert(session.clone()).await;
        Ok(session)
    }

    /// Refines an existing conversation with a follow-up prompt
    ///
    /// The fresh batch replaces the working set wholesale; excluded ids
    /// are filtered out first.
    pub async fn continue_session(&self, session_id: &str, prompt: String) -> AppResult<Session> {
        let aggregator = Arc::clone(&self.aggregator);

        let session = self
            .store
            .update(
                session_id,
                Box::new(move |mut session: Session| -> SessionUpdate {
                    Box::pin(async move {
                        session.prompt_history.push(prompt.clone());
                        session.active_criteria = prompt.clone();

                        let composite = build_composite_prompt(&session, &prompt);
                        let fresh = aggregator.recommend_movies(&composite).await?;

                        let fresh: Vec<Recommendation> = fresh
                            .into_iter()
                            .filter(|rec| !session.is_excluded(rec.id))
                            .collect();

                        session.remember_titles(&fresh);
                        session.current_recommendations = fresh;
                        session.touch();
                        Ok(session)
                    })
                }),
            )
            .await?;

        tracing::info!(
            session_id = %session_id,
            results = session.current_recommendations.len(),
            "Conversation continued"
        );

        Ok(session)
    }

    /// Rejects a recommendation for the rest of the session
    ///
    /// The id never resurfaces. If the working set drops below the
    /// backfill threshold, replacements are fetched and appended.
    pub async fn exclude(&self, session_id: &str, id: i64) -> AppResult<Session> {
        let aggregator = Arc::clone(&self.aggregator);

        let session = self
            .store
            .update(
                session_id,
                Box::new(move |mut session: Session| -> SessionUpdate {
                    Box::pin(async move {
                        if !session.excluded_ids.contains(&id) {
                            session.excluded_ids.push(id);
                        }
                        session.current_recommendations.retain(|rec| rec.id != id);

                        if session.current_recommendations.len() < MIN_VISIBLE_RECOMMENDATIONS {
                            let composite = build_composite_prompt(
                                &session,
                                "Recommend more movies like the ones I liked, avoiding everything I disliked.",
                            );
                            let fresh = aggregator.recommend_movies(&composite).await?;
                            append_new(&mut session, fresh);
                        }

                        session.touch();
                        Ok(session)
                    })
                }),
            )
            .await?;

        tracing::info!(session_id = %session_id, excluded = id, "Recommendation excluded");
        Ok(session)
    }

    /// Records a liked recommendation
    ///
    /// Liking a title currently on screen fetches similar titles and
    /// appends them; liking anything else is recorded without a fetch.
    pub async fn like(&self, session_id: &str, id: i64) -> AppResult<Session> {
        let aggregator = Arc::clone(&self.aggregator);

        let session = self
            .store
            .update(
                session_id,
                Box::new(move |mut session: Session| -> SessionUpdate {
                    Box::pin(async move {
                        if !session.liked_ids.contains(&id) {
                            session.liked_ids.push(id);
                        }

                        let liked = session
                            .current_recommendations
                            .iter()
                            .find(|rec| rec.id == id)
                            .cloned();

                        if let Some(liked) = liked {
                            let request =
                                format!("Recommend more titles similar to {}.", liked.label());
                            let composite = build_composite_prompt(&session, &request);
                            let fresh = aggregator.recommend_movies(&composite).await?;
                            append_new(&mut session, fresh);
                        }

                        session.touch();
                        Ok(session)
                    })
                }),
            )
            .await?;

        tracing::info!(session_id = %session_id, liked = id, "Recommendation liked");
        Ok(session)
    }

    /// Pure read of a session's current state
    pub async fn get(&self, session_id: &str) -> AppResult<Session> {
        self.store
            .get(session_id)
            .await
            .ok_or_else(|| AppError::NotFound(format!("Unknown session: {}", session_id)))
    }
}

/// Appends a fresh batch to the working set, skipping excluded ids and
/// ids already on screen
fn append_new(session: &mut Session, fresh: Vec<Recommendation>) {
    let fresh: Vec<Recommendation> = fresh
        .into_iter()
        .filter(|rec| !session.is_excluded(rec.id) && !session.is_shown(rec.id))
        .collect();

    session.remember_titles(&fresh);
    session.current_recommendations.extend(fresh);
}

/// Builds the composite prompt sent to the aggregator on every turn after
/// the first: the original request, what the user disliked and liked (for
/// titles this session still has display data for), and the new request.
fn build_composite_prompt(session: &Session, new_request: &str) -> String {
    let mut parts = Vec::new();

    parts.push(format!(
        "Original request: {}",
        session
            .prompt_history
            .first()
            .map(String::as_str)
            .unwrap_or_default()
    ));

    let disliked = session.known_labels(&session.excluded_ids);
    if !disliked.is_empty() {
        parts.push(format!("Disliked: {}", disliked.join(", ")));
    }

    let liked = session.known_labels(&session.liked_ids);
    if !liked.is_empty() {
        parts.push(format!("Liked: {}", liked.join(", ")));
    }

    parts.push(format!("New request: {}", new_request));
    parts.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ContentKind, KnownTitle, ResolvedTitle};
    use crate::services::providers::{MockCompletionProvider, MockMetadataResolver};
    use crate::services::session_store::InMemorySessionStore;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::time::Duration;

    /// Completion provider scripted with one JSON payload per expected call
    fn scripted_completions(payloads: Vec<&str>) -> MockCompletionProvider {
        let queue: Mutex<VecDeque<String>> =
            Mutex::new(payloads.into_iter().map(String::from).collect());

        let mut completions = MockCompletionProvider::new();
        completions.expect_complete().returning(move |_, _| {
            Ok(queue
                .lock()
                .unwrap()
                .pop_front()
                .expect("unexpected completion call"))
        });
        completions
    }

    /// Resolver that maps every known name to a fixed id
    fn table_resolver(table: Vec<(&str, i64)>) -> MockMetadataResolver {
        let table: Vec<(String, i64)> = table
            .into_iter()
            .map(|(name, id)| (name.to_string(), id))
            .collect();

        let mut resolver = MockMetadataResolver::new();
        resolver.expect_resolve().returning(move |_, name, _| {
            Ok(table
                .iter()
                .find(|(n, _)| n.as_str() == name)
                .map(|(_, id)| ResolvedTitle {
                    id: *id,
                    poster_url: None,
                }))
        });
        resolver
    }

    fn service(
        completions: MockCompletionProvider,
        resolver: MockMetadataResolver,
    ) -> ConversationService {
        let aggregator = Arc::new(RecommendationAggregator::new(
            Arc::new(completions),
            Arc::new(resolver),
        ));
        let store = InMemorySessionStore::new(Duration::from_secs(300));
        ConversationService::new(store, aggregator)
    }

    const THREE_MOVIES: &str =
        r#"[{"name":"A","year":2010},{"name":"B","year":2011},{"name":"C","year":2012}]"#;

    fn abc_resolver() -> MockMetadataResolver {
        table_resolver(vec![("A", 1), ("B", 2), ("C", 3), ("D", 4), ("E", 5)])
    }

    #[tokio::test]
    async fn test_start_populates_session() {
        let service = service(scripted_completions(vec![THREE_MOVIES]), abc_resolver());

        let session = service.start("sci-fi thrillers".to_string()).await.unwrap();

        assert_eq!(session.prompt_history, vec!["sci-fi thrillers"]);
        assert_eq!(session.active_criteria, "sci-fi thrillers");
        assert!(session.excluded_ids.is_empty());
        assert!(session.liked_ids.is_empty());
        let ids: Vec<i64> = session.current_recommendations.iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![1, 2, 3]);

        // The stored session matches what was returned
        let loaded = service.get(&session.session_id).await.unwrap();
        assert_eq!(loaded.current_recommendations, session.current_recommendations);
    }

    #[tokio::test]
    async fn test_operations_on_unknown_session_fail_closed() {
        let service = service(scripted_completions(vec![]), abc_resolver());

        assert!(matches!(
            service.get("missing").await,
            Err(AppError::NotFound(_))
        ));
        assert!(matches!(
            service
                .continue_session("missing", "funnier".to_string())
                .await,
            Err(AppError::NotFound(_))
        ));
        assert!(matches!(
            service.exclude("missing", 1).await,
            Err(AppError::NotFound(_))
        ));
        assert!(matches!(
            service.like("missing", 1).await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_exclude_removes_from_view_and_backfills() {
        let service = service(
            scripted_completions(vec![
                THREE_MOVIES,
                // Backfill returns one already-shown title and one new one
                r#"[{"name":"A","year":2010},{"name":"D","year":2013}]"#,
            ]),
            abc_resolver(),
        );

        let session = service.start("thrillers".to_string()).await.unwrap();
        let session = service.exclude(&session.session_id, 2).await.unwrap();

        assert_eq!(session.excluded_ids, vec![2]);
        let ids: Vec<i64> = session.current_recommendations.iter().map(|r| r.id).collect();
        // B removed, A and C kept, backfill appended only the new id
        assert_eq!(ids, vec![1, 3, 4]);
    }

    #[tokio::test]
    async fn test_exclude_is_idempotent() {
        let service = service(
            scripted_completions(vec![THREE_MOVIES, r#"[{"name":"D","year":2013}]"#]),
            abc_resolver(),
        );

        let session = service.start("thrillers".to_string()).await.unwrap();
        let first = service.exclude(&session.session_id, 2).await.unwrap();
        let second = service.exclude(&session.session_id, 2).await.unwrap();

        assert_eq!(first.excluded_ids, vec![2]);
        assert_eq!(second.excluded_ids, vec![2]);
        assert!(!second.current_recommendations.iter().any(|r| r.id == 2));
    }

    #[tokio::test]
    async fn test_backfill_filters_excluded_and_deduplicates() {
        let service = service(
            scripted_completions(vec![
                THREE_MOVIES,
                // Backfill tries to bring back the excluded title and a duplicate
                r#"[{"name":"B","year":2011},{"name":"C","year":2012},{"name":"D","year":2013}]"#,
            ]),
            abc_resolver(),
        );

        let session = service.start("thrillers".to_string()).await.unwrap();
        let session = service.exclude(&session.session_id, 2).await.unwrap();

        let ids: Vec<i64> = session.current_recommendations.iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![1, 3, 4]);

        // No duplicates, no excluded ids
        let mut sorted = ids.clone();
        sorted.sort_unstable();
        sorted.dedup();
        assert_eq!(sorted.len(), ids.len());
        assert!(!ids.contains(&2));
    }

    #[tokio::test]
    async fn test_no_backfill_while_enough_remain() {
        let service = service(
            scripted_completions(vec![
                r#"[{"name":"A","year":2010},{"name":"B","year":2011},{"name":"C","year":2012},{"name":"D","year":2013}]"#,
                // No second payload: excluding from 4 leaves 3, no refill call
            ]),
            abc_resolver(),
        );

        let session = service.start("thrillers".to_string()).await.unwrap();
        let session = service.exclude(&session.session_id, 4).await.unwrap();

        let ids: Vec<i64> = session.current_recommendations.iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn test_like_of_shown_title_fetches_similar_and_appends() {
        let queue: Mutex<VecDeque<String>> = Mutex::new(VecDeque::from(vec![
            THREE_MOVIES.to_string(),
            r#"[{"name":"D","year":2013}]"#.to_string(),
        ]));
        let prompts: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(Vec::new()));
        let seen = Arc::clone(&prompts);

        let mut completions = MockCompletionProvider::new();
        completions.expect_complete().returning(move |_, prompt| {
            seen.lock().unwrap().push(prompt.to_string());
            Ok(queue.lock().unwrap().pop_front().expect("unexpected call"))
        });

        let service = service(completions, abc_resolver());

        let session = service.start("thrillers".to_string()).await.unwrap();
        let session = service.like(&session.session_id, 1).await.unwrap();

        assert_eq!(session.liked_ids, vec![1]);
        let ids: Vec<i64> = session.current_recommendations.iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![1, 2, 3, 4]);

        // The similarity prompt names the liked title and year
        let prompts = prompts.lock().unwrap();
        assert!(prompts[1].contains("A (2010)"), "prompt was: {}", prompts[1]);
    }

    #[tokio::test]
    async fn test_like_outside_working_set_records_without_fetching() {
        let service = service(scripted_completions(vec![THREE_MOVIES]), abc_resolver());

        let session = service.start("thrillers".to_string()).await.unwrap();
        // Id 99 was never shown; no second completion is scripted
        let session = service.like(&session.session_id, 99).await.unwrap();

        assert_eq!(session.liked_ids, vec![99]);
        assert_eq!(session.current_recommendations.len(), 3);
    }

    #[tokio::test]
    async fn test_continue_replaces_but_exclude_appends() {
        // Pins the inherited merge-policy asymmetry: a follow-up prompt
        // replaces the working set, an exclusion-triggered backfill
        // appends to it. Product decision to confirm before changing.
        let service = service(
            scripted_completions(vec![
                THREE_MOVIES,
                r#"[{"name":"D","year":2013}]"#,
                r#"[{"name":"E","year":2014}]"#,
            ]),
            abc_resolver(),
        );

        let session = service.start("thrillers".to_string()).await.unwrap();

        // Continue: full replacement, not a merge with A/B/C
        let session = service
            .continue_session(&session.session_id, "funnier".to_string())
            .await
            .unwrap();
        let ids: Vec<i64> = session.current_recommendations.iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![4]);

        // Exclude below threshold: backfill appends to what remains
        let session = service.exclude(&session.session_id, 4).await.unwrap();
        let ids: Vec<i64> = session.current_recommendations.iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![5]);
        assert_eq!(session.prompt_history, vec!["thrillers", "funnier"]);
    }

    #[tokio::test]
    async fn test_no_excluded_id_ever_resurfaces() {
        let service = service(
            scripted_completions(vec![
                THREE_MOVIES,
                // Backfill after excluding B insists on B again
                r#"[{"name":"B","year":2011},{"name":"D","year":2013}]"#,
                // Continue also insists on B
                r#"[{"name":"B","year":2011},{"name":"E","year":2014}]"#,
            ]),
            abc_resolver(),
        );

        let session = service.start("thrillers".to_string()).await.unwrap();
        let session = service.exclude(&session.session_id, 2).await.unwrap();
        assert!(!session.current_recommendations.iter().any(|r| r.id == 2));

        let session = service
            .continue_session(&session.session_id, "more like these".to_string())
            .await
            .unwrap();
        assert!(!session.current_recommendations.iter().any(|r| r.id == 2));
        let ids: Vec<i64> = session.current_recommendations.iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![5]);
    }

    #[tokio::test]
    async fn test_continue_prompt_carries_full_context() {
        let queue: Mutex<VecDeque<String>> = Mutex::new(VecDeque::from(vec![
            THREE_MOVIES.to_string(),
            r#"[{"name":"D","year":2013}]"#.to_string(),
            r#"[{"name":"D","year":2013}]"#.to_string(),
            r#"[{"name":"E","year":2014}]"#.to_string(),
        ]));
        let prompts: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(Vec::new()));
        let seen = Arc::clone(&prompts);

        let mut completions = MockCompletionProvider::new();
        completions.expect_complete().returning(move |_, prompt| {
            seen.lock().unwrap().push(prompt.to_string());
            Ok(queue.lock().unwrap().pop_front().expect("unexpected call"))
        });

        let service = service(completions, abc_resolver());

        let session = service.start("sci-fi thrillers".to_string()).await.unwrap();
        let session = service.exclude(&session.session_id, 2).await.unwrap();
        let session = service.like(&session.session_id, 1).await.unwrap();
        service
            .continue_session(&session.session_id, "now make it funnier".to_string())
            .await
            .unwrap();

        let prompts = prompts.lock().unwrap();
        let composite = prompts.last().unwrap();
        assert!(composite.contains("Original request: sci-fi thrillers"));
        assert!(composite.contains("Disliked: B (2011)"));
        assert!(composite.contains("Liked: A (2010)"));
        assert!(composite.contains("New request: now make it funnier"));
    }

    #[test]
    fn test_composite_prompt_structure() {
        let mut session = Session::new("dark comedies".to_string());
        session.excluded_ids = vec![2];
        session.liked_ids = vec![1];
        session.known_titles.insert(
            1,
            KnownTitle {
                title: "Fargo".to_string(),
                year: Some(1996),
            },
        );
        session.known_titles.insert(
            2,
            KnownTitle {
                title: "Heathers".to_string(),
                year: Some(1988),
            },
        );

        let prompt = build_composite_prompt(&session, "something newer");
        assert_eq!(
            prompt,
            "Original request: dark comedies\n\
             Disliked: Heathers (1988)\n\
             Liked: Fargo (1996)\n\
             New request: something newer"
        );
    }

    #[test]
    fn test_composite_prompt_omits_empty_sections() {
        let session = Session::new("dark comedies".to_string());
        let prompt = build_composite_prompt(&session, "something newer");
        assert_eq!(
            prompt,
            "Original request: dark comedies\nNew request: something newer"
        );
    }

    #[test]
    fn test_composite_prompt_skips_ids_without_title_data() {
        let mut session = Session::new("dark comedies".to_string());
        // Excluded id the session never had display data for
        session.excluded_ids = vec![42];

        let prompt = build_composite_prompt(&session, "more");
        assert!(!prompt.contains("Disliked"));
    }

    #[test]
    fn test_append_new_skips_excluded_and_shown() {
        let rec = |id: i64, title: &str| Recommendation {
            id,
            title: title.to_string(),
            year: None,
            poster_url: None,
            kind: ContentKind::Movie,
        };

        let mut session = Session::new("anything".to_string());
        session.excluded_ids = vec![2];
        session.current_recommendations = vec![rec(1, "A")];

        append_new(&mut session, vec![rec(1, "A"), rec(2, "B"), rec(3, "C")]);

        let ids: Vec<i64> = session.current_recommendations.iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![1, 3]);
        // Appended titles become part of the session's display memo
        assert!(session.known_titles.contains_key(&3));
    }
}
