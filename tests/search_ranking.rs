use pretty_assertions::assert_eq;
use techinsight::{
    embed, Article, ArticleStore, EmbeddedArticle, Embedder, Error, MemoryArticleStore,
    SearchConfig, SimilarityRanker,
};

const DIM: usize = 384;

fn row(id: i64, title: &str, content: &str) -> EmbeddedArticle {
    let article = Article {
        id,
        title: title.into(),
        content: content.into(),
        author: None,
        category: None,
        published_at: None,
    };
    let embedding = embed(&article.embedding_text(), DIM);
    EmbeddedArticle { article, embedding }
}

async fn catalog() -> MemoryArticleStore {
    let mut store = MemoryArticleStore::new(DIM);
    store
        .insert_batch(&[
            row(4, "Pasta recipes", "Cooking tomato sauce at home"),
            row(2, "rust systems programming", ""),
            row(3, "cooking recipes", ""),
            row(1, "rust systems programming", ""),
            row(5, "...", "!!!"),
        ])
        .await
        .expect("seed catalog");
    store
}

fn ranker() -> SimilarityRanker {
    SimilarityRanker::new(Embedder::default(), SearchConfig::default())
}

#[tokio::test(flavor = "current_thread")]
async fn identical_documents_tie_ahead_of_unrelated_text() {
    let store = catalog().await;
    let ranker = ranker();
    let params = ranker.params(Some(10), Some(0.6)).expect("params");

    let hits = ranker
        .search(&store, "systems programming", params)
        .await
        .expect("search");

    let ids: Vec<i64> = hits.iter().map(|hit| hit.article.id).collect();
    // "cooking" shares a hash slot with "programming", which pulls id 3 under
    // the threshold; the pasta article stays out.
    assert_eq!(ids, vec![1, 2, 3]);
    assert_eq!(hits[0].distance.to_bits(), hits[1].distance.to_bits());
    assert!((hits[0].distance - 0.183_503_419).abs() < 1e-6);
    assert!((hits[2].distance - 0.5).abs() < 1e-6);
    assert!(hits[0].score > hits[2].score);
}

#[tokio::test(flavor = "current_thread")]
async fn results_are_sorted_thresholded_and_limited() {
    let store = catalog().await;
    let ranker = ranker();

    for (limit, max_distance) in [(1, 0.6), (2, 2.0), (50, 2.0), (10, 0.3), (10, 0.0)] {
        let params = ranker.params(Some(limit), Some(max_distance)).expect("params");
        let hits = ranker
            .search(&store, "rust cooking pasta", params)
            .await
            .expect("search");
        assert!(hits.len() <= limit);
        assert!(hits.iter().all(|hit| hit.distance <= max_distance));
        assert!(hits.windows(2).all(|w| w[0].distance <= w[1].distance));
        assert!(hits.windows(2).all(|w| w[0].score >= w[1].score));
        for hit in &hits {
            assert_eq!(hit.score, 1.0 / (1.0 + hit.distance));
        }
    }
}

#[tokio::test(flavor = "current_thread")]
async fn tokenless_query_matches_nothing() {
    let store = catalog().await;
    let ranker = ranker();
    let params = ranker.params(None, Some(2.0)).expect("params");

    let hits = ranker.search(&store, "?!", params).await.expect("search");
    assert!(hits.is_empty());
}

#[tokio::test(flavor = "current_thread")]
async fn empty_and_blank_queries_match_nothing() {
    let store = catalog().await;
    let ranker = ranker();
    let params = ranker.params(Some(50), Some(2.0)).expect("params");

    for query in ["", "   ", "?!"] {
        let hits = ranker.search(&store, query, params).await.expect("search");
        assert_eq!(hits, Vec::new(), "{query:?}");
    }
}

#[tokio::test(flavor = "current_thread")]
async fn dimension_mismatch_surfaces_to_caller() {
    let store = MemoryArticleStore::new(64);
    let ranker = ranker();
    let params = ranker.params(None, None).expect("params");

    let err = ranker
        .search(&store, "rust", params)
        .await
        .expect_err("mismatched dims");
    assert!(matches!(
        err,
        Error::DimensionMismatch {
            expected: 384,
            actual: 64
        }
    ));
}

#[tokio::test(flavor = "current_thread")]
async fn no_match_is_an_empty_list() {
    let store = catalog().await;
    let ranker = ranker();
    let params = ranker.params(None, None).expect("params");

    let hits = ranker
        .search(&store, "quantum chromodynamics", params)
        .await
        .expect("search");
    assert!(hits.is_empty());
}
