//! Edit-flow coverage against real storage: counter increments, draft
//! transitions and participant synchronization.

use palaver_core::error::AppError;
use palaver_core::models::DiscussionInput;
use palaver_core::traits::ForumRepo;
use palaver_engine::DiscussionService;
use palaver_integration_tests::seeded_board;

fn input(board: &palaver_integration_tests::SeededBoard, title: &str) -> DiscussionInput {
    DiscussionInput {
        place: board.support.id,
        user: board.alice.id,
        title: Some(title.to_string()),
        body: "body".to_string(),
        participants: String::new(),
        draft: false,
        start: true,
    }
}

#[tokio::test]
async fn starting_bumps_place_and_author_counters() -> anyhow::Result<()> {
    let board = seeded_board().await?;
    let service = DiscussionService::new(board.repo.clone(), board.memo.clone());

    service.start(input(&board, "First")).await?;

    let place = board.repo.load_place(board.support.id).await?.unwrap();
    assert_eq!(place.total_discussions, 1);

    let author = board.repo.get_user(board.alice.id).await?.unwrap();
    assert_eq!(author.total_discussions, 1);

    Ok(())
}

#[tokio::test]
async fn drafting_defers_the_increment_until_publication() -> anyhow::Result<()> {
    let board = seeded_board().await?;
    let service = DiscussionService::new(board.repo.clone(), board.memo.clone());

    let mut draft_input = input(&board, "Slow burner");
    draft_input.draft = true;
    draft_input.start = false;

    let draft = service.start(draft_input).await?;

    let place = board.repo.load_place(board.support.id).await?.unwrap();
    assert_eq!(place.total_discussions, 0);
    assert!(draft.draft);

    let mut publish = input(&board, "Slow burner");
    publish.start = false;
    let published = service.edit(Some(draft), publish).await?;

    assert!(!published.draft);
    let place = board.repo.load_place(board.support.id).await?.unwrap();
    assert_eq!(place.total_discussions, 1);

    Ok(())
}

#[tokio::test]
async fn untitled_drafts_get_a_stand_in_title() -> anyhow::Result<()> {
    let board = seeded_board().await?;
    let service = DiscussionService::new(board.repo.clone(), board.memo.clone());

    let mut draft_input = input(&board, "");
    draft_input.title = None;
    draft_input.draft = true;
    draft_input.start = false;

    let draft = service.start(draft_input).await?;
    assert_eq!(draft.title, "Untitled Discussion");

    Ok(())
}

#[tokio::test]
async fn participants_sync_keeps_existing_rows_and_inserts_net_new() -> anyhow::Result<()> {
    let board = seeded_board().await?;
    let service = DiscussionService::new(board.repo.clone(), board.memo.clone());

    let mut private_input = input(&board, "Private planning");
    private_input.participants = "bram".to_string();

    let saved = service.start(private_input).await?;
    assert!(saved.private);

    let rows = board.repo.participants_for(saved.id).await?;
    assert_eq!(rows.len(), 1);
    let bram_row = rows[0].id;

    // Add alice; bram's existing row must survive untouched.
    let mut widen = input(&board, "Private planning");
    widen.start = false;
    widen.participants = "bram, alice".to_string();
    let saved = service.edit(Some(saved), widen).await?;

    let rows = board.repo.participants_for(saved.id).await?;
    assert_eq!(rows.len(), 2);
    assert!(rows.iter().any(|row| row.id == bram_row));

    // Unknown usernames are dropped quietly; narrowing deletes the rest.
    let mut narrow = input(&board, "Private planning");
    narrow.start = false;
    narrow.participants = "bram, nobody-here".to_string();
    let saved = service.edit(Some(saved), narrow).await?;

    let rows = board.repo.participants_for(saved.id).await?;
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].user_id, board.bram.id);

    // Clearing the list deletes everyone and the discussion goes public.
    let mut clear = input(&board, "Private planning");
    clear.start = false;
    let saved = service.edit(Some(saved), clear).await?;

    assert!(!saved.private);
    assert!(board.repo.participants_for(saved.id).await?.is_empty());

    Ok(())
}

#[tokio::test]
async fn find_serves_discussions_through_the_cache() -> anyhow::Result<()> {
    let board = seeded_board().await?;
    let service = DiscussionService::new(board.repo.clone(), board.memo.clone());

    let saved = service.start(input(&board, "Cached")).await?;

    let found = service.find(saved.id).await?.expect("just saved");
    assert_eq!(found.title, "Cached");

    // A rename behind the cache stays invisible within the TTL.
    let mut renamed = found.clone();
    renamed.title = "Renamed".to_string();
    board.repo.save_discussion(&renamed).await?;

    let stale = service.find(saved.id).await?.expect("still cached");
    assert_eq!(stale.title, "Cached");

    Ok(())
}

#[tokio::test]
async fn participants_render_as_a_comma_separated_username_list() -> anyhow::Result<()> {
    let board = seeded_board().await?;
    let service = DiscussionService::new(board.repo.clone(), board.memo.clone());

    let mut private_input = input(&board, "Private");
    private_input.participants = "bram".to_string();
    let saved = service.start(private_input).await?;

    assert_eq!(service.participants_to_string(&saved).await?, "bram");

    let public = service.start(input(&board, "Public")).await?;
    assert_eq!(service.participants_to_string(&public).await?, "");

    Ok(())
}

#[tokio::test]
async fn starting_under_a_missing_place_fails_before_anything_happens() -> anyhow::Result<()> {
    let board = seeded_board().await?;
    let service = DiscussionService::new(board.repo.clone(), board.memo.clone());

    let mut orphan = input(&board, "Nowhere");
    orphan.place = uuid::Uuid::now_v7();

    let result = service.start(orphan).await;

    assert!(matches!(result, Err(AppError::NotFound(_, _))));
    let author = board.repo.get_user(board.alice.id).await?.unwrap();
    assert_eq!(author.total_discussions, 0);

    Ok(())
}
