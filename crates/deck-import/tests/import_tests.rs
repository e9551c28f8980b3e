use deck_export::octgn::{
    CardSet, DeckList, DeckListCard, DeckSection, SetAlternate, SetCard, write_o8d, write_set_xml,
};
use deck_import::*;
use deck_model::{CardKind, CardRecord, DeckListEntry, Facing, SizeClass};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

/// In-memory remote database
struct FakeRemote {
    cards: HashMap<String, CardRecord>,
    decks: HashMap<String, DeckListing>,
}

impl RemoteCardDatabase for FakeRemote {
    async fn fetch_card(&self, code: &str) -> Result<CardRecord> {
        self.cards
            .get(code)
            .cloned()
            .ok_or_else(|| ImportError::UnknownCard(code.to_string()))
    }

    async fn fetch_deck_list(&self, deck_id: &str) -> Result<DeckListing> {
        self.decks
            .get(deck_id)
            .cloned()
            .ok_or_else(|| ImportError::Database(format!("no deck {}", deck_id)))
    }
}

fn record(code: &str, name: &str, front: Option<Vec<u8>>) -> CardRecord {
    CardRecord {
        code: code.to_string(),
        name: Some(name.to_string()),
        kind: CardKind::Player,
        front_image: front,
        ..Default::default()
    }
}

fn remote() -> FakeRemote {
    let mut cards = HashMap::new();
    cards.insert("01001a".into(), record("01001a", "Spider-Man", Some(vec![1; 4])));
    cards.insert("01002".into(), record("01002", "Black Cat", Some(vec![2; 4])));
    cards.insert("01003".into(), record("01003", "Web-Shooter", None));
    let mut decks = HashMap::new();
    decks.insert(
        "100".into(),
        DeckListing {
            name: "Spidey".into(),
            entries: vec![DeckListEntry::new("01001a", 1), DeckListEntry::new("01002", 3)],
        },
    );
    decks.insert(
        "200".into(),
        DeckListing {
            name: "Broken".into(),
            entries: vec![DeckListEntry::new("01002", 1), DeckListEntry::new("01003", 2)],
        },
    );
    FakeRemote { cards, decks }
}

#[tokio::test]
async fn test_remote_deck_in_list_order() {
    let deck = import_remote_deck(&remote(), "100", SizeClass::Standard)
        .await
        .unwrap();
    assert_eq!(deck.name(), "Spidey");
    assert_eq!(deck.len(), 4);
    let names: Vec<_> = deck
        .entries()
        .iter()
        .map(|e| e.card.display_name())
        .collect();
    assert_eq!(names, ["Spider-Man", "Black Cat", "Black Cat", "Black Cat"]);
    // Copies share one card
    assert!(Arc::ptr_eq(deck.card(1).unwrap(), deck.card(3).unwrap()));
}

#[tokio::test]
async fn test_missing_front_aborts_import() {
    match import_remote_deck(&remote(), "200", SizeClass::Standard).await {
        Err(ImportError::MissingImage { code, name }) => {
            assert_eq!(code, "01003");
            assert_eq!(name, "Web-Shooter");
        }
        other => panic!("expected MissingImage, got {:?}", other.map(|d| d.len())),
    }
}

#[tokio::test]
async fn test_unknown_deck_fails() {
    assert!(
        import_remote_deck(&remote(), "999", SizeClass::Standard)
            .await
            .is_err()
    );
}

// =============================================================================
// Local OCTGN database
// =============================================================================

const GAME: &str = "055c536f-adba-4bc2-acbf-9aefb9756046";
const SET: &str = "6f1d2f9e-0000-4000-8000-000000000001";
const HERO: &str = "6f1d2f9e-0000-4000-8000-000000000002";
const ALLY: &str = "6f1d2f9e-0000-4000-8000-000000000003";

fn write(path: &Path, bytes: &[u8]) {
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, bytes).unwrap();
}

fn install(data: &Path) {
    let set = CardSet {
        name: "Fan Set".into(),
        id: SET.into(),
        game_id: GAME.into(),
        cards: vec![
            SetCard {
                id: HERO.into(),
                name: "Hero".into(),
                size: None,
                properties: vec![("Type".into(), "hero".into())],
                alternate: Some(SetAlternate {
                    name: "Alter Ego".into(),
                    properties: Vec::new(),
                }),
            },
            SetCard {
                id: ALLY.into(),
                name: "Ally".into(),
                size: Some("EncounterCard".into()),
                ..SetCard::default()
            },
        ],
    };
    let sets = data.join("GameDatabase").join(GAME).join("Sets").join(SET);
    write(&sets.join("set.xml"), write_set_xml(&set).as_bytes());

    let cards = data
        .join("ImageDatabase")
        .join(GAME)
        .join("Sets")
        .join(SET)
        .join("Cards");
    write(&cards.join(format!("{}.png", HERO)), &[1, 1, 1]);
    write(&cards.join(format!("{}.b.png", HERO)), &[2, 2, 2]);
    write(&cards.join(format!("{}.jpg", ALLY)), &[3, 3, 3]);
}

fn deck_file(dir: &Path, game: &str) -> std::path::PathBuf {
    let list = DeckList {
        game_id: game.into(),
        sections: vec![DeckSection {
            name: "Cards".into(),
            shared: false,
            cards: vec![
                DeckListCard {
                    id: HERO.into(),
                    qty: 1,
                    alternate: true,
                    name: "Hero".into(),
                },
                DeckListCard {
                    id: ALLY.into(),
                    qty: 2,
                    alternate: false,
                    name: "Ally".into(),
                },
            ],
        }],
        notes: None,
    };
    let path = dir.join("My Deck.o8d");
    write(&path, write_o8d(&list).as_bytes());
    path
}

#[tokio::test]
async fn test_octgn_database_lists_cards() {
    let dir = tempfile::tempdir().unwrap();
    install(dir.path());
    let db = OctgnDatabase::new(dir.path());
    let cards = db.list_cards().await.unwrap();
    assert_eq!(cards.len(), 2);
    assert_eq!(cards[0].set.as_deref(), Some("Fan Set"));
    assert_eq!(cards[1].kind, CardKind::Encounter);
    assert!(cards.iter().all(|c| c.front_image.is_none()));
}

#[tokio::test]
async fn test_octgn_deck_import() {
    let dir = tempfile::tempdir().unwrap();
    install(dir.path());
    let path = deck_file(dir.path(), GAME);
    let db = OctgnDatabase::new(dir.path());

    let deck = import_local_deck(&db, &path, SizeClass::Standard)
        .await
        .unwrap();
    assert_eq!(deck.name(), "My Deck");
    assert_eq!(deck.len(), 3);
    assert_eq!(deck.entries()[0].facing, Facing::Alternate);
    let hero = deck.card(0).unwrap();
    assert_eq!(hero.front().data(), &[1, 1, 1]);
    assert_eq!(hero.back().unwrap().data(), &[2, 2, 2]);
    assert_eq!(hero.metadata().back_name.as_deref(), Some("Alter Ego"));
    assert_eq!(hero.id().to_string(), HERO);
    assert_eq!(deck.card(2).unwrap().front().data(), &[3, 3, 3]);
}

#[tokio::test]
async fn test_octgn_deck_for_other_game_rejected() {
    let dir = tempfile::tempdir().unwrap();
    install(dir.path());
    let path = deck_file(dir.path(), "00000000-0000-0000-0000-000000000000");
    let db = OctgnDatabase::new(dir.path());
    assert!(matches!(
        import_local_deck(&db, &path, SizeClass::Standard).await,
        Err(ImportError::Database(_))
    ));
}

#[tokio::test]
async fn test_missing_data_dir() {
    let db = OctgnDatabase::new("/nonexistent/octgn/Data");
    assert!(matches!(
        db.list_cards().await,
        Err(ImportError::Database(_))
    ));
}
