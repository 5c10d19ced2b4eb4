mod common;

use common::{harness, person, sample, user, video, Harness};
use veea_lib::{
    dashboard::{Scope, Window},
    error::{Error, InputError},
    identity::Identifier,
};

/// Record one sample at each offset, each carrying `people`.
async fn watch(h: &Harness, view: &Identifier, offsets: &[f64], people: &[veea_lib::db::PersonReading]) {
    for &offset in offsets {
        let sample_id = h
            .state
            .views
            .record_sample("v1", sample(view.as_str(), offset))
            .await
            .unwrap();
        if !people.is_empty() {
            h.state.views.record_readings(sample_id, people).await.unwrap();
        }
    }
}

#[tokio::test]
async fn video_windows_are_clipped_at_the_duration() {
    let h = harness();
    let alice = user(&h.state, "alice").await;
    video(&h.state, "v1").await;
    let view = h.state.views.start_view(alice, "v1").await.unwrap();

    let mut happy = person(-1.0, 25);
    happy.happy = 0.8;
    watch(&h, &view, &[1.0, 6.0, 12.0], &[happy]).await;

    let stats = h.state.dashboards.video_dashboard("v1", 10.0).await.unwrap();
    assert_eq!(stats.instant_stats.len(), 2);
    assert_eq!(
        stats.instant_viewed_count.keys().collect::<Vec<_>>(),
        vec!["2.5", "7.5"]
    );
    assert_eq!(stats.instant_viewed_count["2.5"], 1);
    assert_eq!(stats.instant_viewed_count["7.5"], 1);
    assert_eq!(stats.instant_stats["7.5"].happy, 0.8);

    // Overall figures still include the sample past the end.
    assert_eq!(stats.male_count, 3);
    assert_eq!(stats.age_counts.counts(), [0, 1, 0, 0]);
}

#[tokio::test]
async fn age_bands_count_each_age_once() {
    let h = harness();
    let alice = user(&h.state, "alice").await;
    video(&h.state, "v1").await;
    let view = h.state.views.start_view(alice, "v1").await.unwrap();
    watch(
        &h,
        &view,
        &[1.0],
        &[person(-1.0, 25), person(1.0, 25), person(0.0, 25), person(1.0, 27)],
    )
    .await;
    watch(&h, &view, &[6.0], &[person(-1.0, 25), person(1.0, 60)]).await;

    let stats = h.state.dashboards.video_dashboard("v1", 10.0).await.unwrap();
    assert_eq!(stats.age_counts.counts(), [0, 2, 0, 1]);

    let scope = Scope::View(view.as_str().to_string());
    let histogram = h.state.dashboards.age_histogram(scope).await.unwrap();
    assert_eq!(histogram, stats.age_counts);
}

#[tokio::test]
async fn views_visitors_and_average_duration() {
    let h = harness();
    let alice = user(&h.state, "alice").await;
    let bob = user(&h.state, "bob").await;
    video(&h.state, "v1").await;

    let long = h.state.views.start_view(alice, "v1").await.unwrap();
    let short = h.state.views.start_view(alice, "v1").await.unwrap();
    let other = h.state.views.start_view(bob, "v1").await.unwrap();
    watch(&h, &long, &[1.0, 6.0, 12.0], &[]).await;
    watch(&h, &short, &[1.0], &[]).await;
    watch(&h, &other, &[2.0, 8.0], &[]).await;

    let stats = h.state.dashboards.video_dashboard("v1", 10.0).await.unwrap();
    assert_eq!(stats.total_views, 3);
    assert_eq!(stats.unique_visitors, 2);
    // The 15 second view is outside [0, 10] and left out.
    assert!(stats.avg_view_duration_present);
    assert_eq!(stats.avg_view_duration, 7.5);
    assert_eq!(stats.instant_viewed_count["2.5"], 3);
    assert_eq!(stats.instant_viewed_count["7.5"], 2);

    let short_only = h.state.dashboards.video_dashboard("v1", 4.0).await.unwrap();
    assert!(!short_only.avg_view_duration_present);
    assert_eq!(short_only.avg_view_duration, 0.0);
}

#[tokio::test]
async fn empty_means_use_their_defaults() {
    let h = harness();
    let alice = user(&h.state, "alice").await;
    video(&h.state, "v1").await;
    let view = h.state.views.start_view(alice, "v1").await.unwrap();
    watch(&h, &view, &[1.0], &[]).await;

    let stats = h.state.dashboards.video_dashboard("v1", 5.0).await.unwrap();
    assert_eq!(stats.stats.engagement, 1.0);
    assert_eq!(stats.stats.mood, 0.0);
    assert_eq!(stats.stats.happy, 0.0);
    assert_eq!(stats.instant_stats["2.5"].engagement, 1.0);
    assert_eq!(stats.male_count + stats.female_count, 0);
}

#[tokio::test]
async fn gender_zero_is_counted_as_neither() {
    let h = harness();
    let alice = user(&h.state, "alice").await;
    video(&h.state, "v1").await;
    let view = h.state.views.start_view(alice, "v1").await.unwrap();
    watch(
        &h,
        &view,
        &[1.0],
        &[
            person(-1.0, 10),
            person(1.0, 45),
            person(0.0, 70),
            person(0.3, -1),
        ],
    )
    .await;

    let scope = Scope::Video("v1".into());
    let (male, female) = h.state.dashboards.gender_counts(scope.clone()).await.unwrap();
    assert_eq!((male, female), (1, 2));

    let histogram = h.state.dashboards.age_histogram(scope).await.unwrap();
    assert_eq!(histogram.counts(), [1, 0, 1, 1]);
    assert_eq!(histogram.total(), 3);
}

#[tokio::test]
async fn single_view_dashboard() {
    let h = harness();
    let alice = user(&h.state, "alice").await;
    video(&h.state, "v1").await;
    video(&h.state, "v2").await;
    let mine = h.state.views.start_view(alice, "v1").await.unwrap();
    let theirs = h.state.views.start_view(alice, "v1").await.unwrap();

    let mut sad = person(1.0, 40);
    sad.sad = 0.6;
    watch(&h, &mine, &[1.0, 3.0], &[sad]).await;
    watch(&h, &theirs, &[1.0], &[person(-1.0, 40)]).await;

    let stats = h
        .state
        .dashboards
        .view_dashboard("v1", mine.as_str(), 5.0)
        .await
        .unwrap();
    assert_eq!(stats.total_views, 1);
    assert_eq!(stats.unique_visitors, 1);
    assert_eq!((stats.male_count, stats.female_count), (0, 2));
    assert_eq!(stats.stats.sad, 0.6);
    assert_eq!(stats.instant_viewed_count["2.5"], 2);
    assert_eq!(stats.avg_view_duration, 5.0);

    let err = h
        .state
        .dashboards
        .view_dashboard("v2", mine.as_str(), 5.0)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Input(InputError::ViewVideoMismatch { .. })));

    let err = h
        .state
        .dashboards
        .view_dashboard("v1", "nope", 5.0)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Input(InputError::UnknownView(_))));
}

#[tokio::test]
async fn window_queries_are_half_open() {
    let h = harness();
    let alice = user(&h.state, "alice").await;
    video(&h.state, "v1").await;
    let view = h.state.views.start_view(alice, "v1").await.unwrap();

    let mut afraid = person(0.0, 20);
    afraid.afraid = 0.4;
    watch(&h, &view, &[0.0, 5.0], &[afraid]).await;

    let scope = Scope::View(view.as_str().to_string());
    let first = Window { start: 0.0, end: 5.0 };
    assert_eq!(
        h.state.dashboards.window_viewed_count(scope.clone(), first).await.unwrap(),
        1
    );
    let means = h.state.dashboards.window_means(scope.clone(), first).await.unwrap();
    assert_eq!(means.afraid, 0.4);

    let empty = Window { start: 20.0, end: 25.0 };
    let means = h.state.dashboards.window_means(scope, empty).await.unwrap();
    assert_eq!(means.engagement, 1.0);
    assert_eq!(means.afraid, 0.0);
}

#[tokio::test]
async fn out_of_range_durations_are_rejected() {
    let h = harness();
    video(&h.state, "v1").await;

    for duration in [-1.0, f64::NAN, 5.0 * 60.0 * 60.0 + 1.0] {
        let err = h
            .state
            .dashboards
            .video_dashboard("v1", duration)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Input(InputError::InvalidVideoDuration(_))));
    }

    let err = h
        .state
        .dashboards
        .video_dashboard("missing", 10.0)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Input(InputError::UnknownVideo(_))));

    let stats = h.state.dashboards.video_dashboard("v1", 0.0).await.unwrap();
    assert_eq!(stats.total_views, 0);
    assert!(stats.instant_stats.is_empty());
}
