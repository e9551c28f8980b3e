use deck_export::octgn::*;
use deck_export::*;
use deck_model::{Card, CardImage, CardKind, CardMetadata, Deck, Facing, Sidedness, SizeClass};
use image::{Rgba, RgbaImage};
use std::collections::BTreeMap;
use std::io::{Cursor, Read};
use std::sync::Arc;

fn solid_png(color: [u8; 4], width: u32, height: u32) -> Vec<u8> {
    let mut buf = Vec::new();
    RgbaImage::from_pixel(width, height, Rgba(color))
        .write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
        .unwrap();
    buf
}

fn card(name: &str, kind: CardKind, shade: u8) -> Card {
    let mut fields = BTreeMap::new();
    fields.insert("Cost".to_string(), "2".to_string());
    fields.insert("Text".to_string(), "Deal 3 damage & <stun>.".to_string());
    Card::new(
        CardImage::new(solid_png([shade, 0, 0, 255], 40, 56)),
        SizeClass::Standard,
    )
    .unwrap()
    .with_metadata(CardMetadata {
        name: Some(name.to_string()),
        set: Some("Core Set".to_string()),
        kind,
        fields,
        back_name: None,
    })
}

fn sample_deck() -> Deck {
    let hero = Arc::new(
        card("Spider-Man", CardKind::Player, 10)
            .with_back(Some(CardImage::new(solid_png([0, 0, 200, 255], 40, 56)))),
    );
    let web = Arc::new(card("Web-Shooter", CardKind::Player, 20));
    let rhino = Arc::new(card("Rhino", CardKind::Villain, 30));
    let minion = Arc::new(card("Hydra Soldier", CardKind::Encounter, 40));

    let mut deck = Deck::default();
    deck.rename("Spider-Man: Starter");
    deck.add_card(Arc::clone(&hero)).unwrap();
    deck.add_card(Arc::clone(&web)).unwrap();
    deck.add_card(Arc::clone(&web)).unwrap();
    deck.add_card(Arc::clone(&rhino)).unwrap();
    deck.add_card(Arc::clone(&minion)).unwrap();
    deck.add_card(Arc::clone(&web)).unwrap();
    deck.add_card(Arc::clone(&hero)).unwrap();
    deck.set_facing(6, Facing::Alternate).unwrap();
    deck.set_shared_back(Some(
        CardImage::new(solid_png([90, 90, 90, 255], 40, 56)).with_bleed(2.0),
    ))
    .unwrap();
    deck
}

fn entry_text(bytes: &[u8], suffix: &str) -> String {
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
    let name = archive
        .file_names()
        .find(|n| n.ends_with(suffix))
        .unwrap()
        .to_string();
    let mut text = String::new();
    archive
        .by_name(&name)
        .unwrap()
        .read_to_string(&mut text)
        .unwrap();
    text
}

#[test]
fn test_round_trip_reproduces_deck() {
    let deck = sample_deck();
    let bytes = export_octgn(&deck, &OctgnOptions::default(), &RasterCodec::default()).unwrap();
    let imported = import_octgn(&bytes).unwrap();

    assert_eq!(imported.name(), deck.name());
    assert_eq!(imported.set_id(), deck.set_id());
    assert_eq!(imported.size_class(), deck.size_class());
    assert_eq!(imported.sidedness(), deck.sidedness());
    assert_eq!(imported.len(), deck.len());
    assert_eq!(imported.shared_back(), deck.shared_back());

    for (a, b) in deck.entries().iter().zip(imported.entries()) {
        assert_eq!(a.card.id(), b.card.id());
        assert_eq!(a.facing, b.facing);
        assert_eq!(a.card.front().data(), b.card.front().data());
        assert_eq!(a.card.back(), b.card.back());
        assert_eq!(a.card.metadata(), b.card.metadata());
    }
    // Copies of one card stay one card
    assert!(Arc::ptr_eq(
        imported.card(1).unwrap(),
        imported.card(2).unwrap()
    ));
}

#[test]
fn test_round_trip_single_back_shared() {
    let mut deck = Deck::new(SizeClass::Small);
    for shade in [1u8, 2, 3] {
        deck.add_card(
            Card::new(
                CardImage::new(solid_png([shade, shade, shade, 255], 20, 30)),
                SizeClass::Small,
            )
            .unwrap(),
        )
        .unwrap();
    }
    deck.set_shared_back(Some(CardImage::new(solid_png([5, 5, 5, 255], 20, 30))))
        .unwrap();
    deck.set_sidedness(Sidedness::SingleBackShared).unwrap();

    let bytes = export_octgn(&deck, &OctgnOptions::default(), &RasterCodec::default()).unwrap();
    let imported = import_octgn(&bytes).unwrap();
    assert_eq!(imported.size_class(), SizeClass::Small);
    assert_eq!(imported.sidedness(), Sidedness::SingleBackShared);
    assert_eq!(imported.len(), 3);
    // Unnamed cards stay unnamed
    assert_eq!(imported.card(0).unwrap().metadata().name, None);
}

#[test]
fn test_consecutive_copies_collapse() {
    let deck = sample_deck();
    let bytes = export_octgn(&deck, &OctgnOptions::default(), &RasterCodec::default()).unwrap();
    let list = parse_o8d(&entry_text(&bytes, ".o8d")).unwrap();

    let lines: Vec<_> = list
        .cards()
        .map(|(s, c)| (s.name.as_str(), c.name.as_str(), c.qty, c.alternate))
        .collect();
    assert_eq!(
        lines,
        vec![
            ("Cards", "Spider-Man", 1, false),
            ("Cards", "Web-Shooter", 2, false),
            ("Villain", "Rhino", 1, false),
            ("Encounter", "Hydra Soldier", 1, false),
            ("Cards", "Web-Shooter", 1, false),
            ("Cards", "Spider-Man", 1, true),
        ]
    );
    assert_eq!(list.card_count(), deck.len());
}

#[test]
fn test_set_xml_contents() {
    let deck = sample_deck();
    let bytes = export_octgn(&deck, &OctgnOptions::default(), &RasterCodec::default()).unwrap();
    let set = parse_set_xml(&entry_text(&bytes, "set.xml")).unwrap();

    assert_eq!(set.game_id, deck_export::constants::MARVEL_CHAMPIONS_GAME_ID);
    assert_eq!(set.cards.len(), 4);
    let rhino = set.cards.iter().find(|c| c.name == "Rhino").unwrap();
    assert_eq!(rhino.size.as_deref(), Some("VillainCard"));
    assert_eq!(rhino.property("Set"), Some("Core Set"));
    assert_eq!(rhino.property("Text"), Some("Deal 3 damage & <stun>."));
    let hero = set.cards.iter().find(|c| c.name == "Spider-Man").unwrap();
    assert!(hero.size.is_none());
    assert!(hero.alternate.is_some());
}

#[test]
fn test_archive_layout() {
    let deck = sample_deck();
    let bytes = export_octgn(&deck, &OctgnOptions::default(), &RasterCodec::default()).unwrap();
    let archive = zip::ZipArchive::new(Cursor::new(bytes.as_slice())).unwrap();
    let names: Vec<_> = archive.file_names().collect();
    let game = deck_export::constants::MARVEL_CHAMPIONS_GAME_ID;
    let set = deck.set_id();

    let hero = deck.card(0).unwrap().id();
    for expected in [
        format!("GameDatabase/{}/Sets/{}/set.xml", game, set),
        format!("GameDatabase/{}/FanMade/Spider-Man_ Starter.o8d", game),
        format!("ImageDatabase/{}/Sets/{}/SharedBack.png", game, set),
        format!("ImageDatabase/{}/Sets/{}/Cards/{}.png", game, set, hero),
        format!("ImageDatabase/{}/Sets/{}/Cards/{}.b.png", game, set, hero),
    ] {
        assert!(names.contains(&expected.as_str()), "missing {}", expected);
    }
}

#[test]
fn test_kind_backs_round_trip() {
    let mut deck = sample_deck();
    let encounter_back = CardImage::new(solid_png([0, 120, 0, 255], 40, 56)).with_bleed(1.0);
    deck.set_kind_back(CardKind::Encounter, Some(encounter_back.clone()));
    deck.set_kind_back(
        CardKind::Villain,
        Some(CardImage::new(solid_png([120, 0, 120, 255], 40, 56))),
    );

    let bytes = export_octgn(&deck, &OctgnOptions::default(), &RasterCodec::default()).unwrap();
    let archive = zip::ZipArchive::new(Cursor::new(bytes.as_slice())).unwrap();
    let expected = format!(
        "ImageDatabase/{}/Sets/{}/EncounterBack.png",
        deck_export::constants::MARVEL_CHAMPIONS_GAME_ID,
        deck.set_id()
    );
    assert!(archive.file_names().any(|n| n == expected));

    let imported = import_octgn(&bytes).unwrap();
    assert_eq!(imported.kind_back(CardKind::Encounter), Some(&encounter_back));
    assert_eq!(
        imported.kind_back(CardKind::Villain),
        deck.kind_back(CardKind::Villain)
    );
    assert_eq!(imported.kind_back(CardKind::Player), None);
}

#[test]
fn test_set_field_without_set_name_round_trips() {
    let mut fields = BTreeMap::new();
    fields.insert("Cost".to_string(), "1".to_string());
    fields.insert("Set".to_string(), "Expansion note".to_string());
    let metadata = CardMetadata {
        name: Some("Black Cat".to_string()),
        set: None,
        kind: CardKind::Player,
        fields,
        back_name: None,
    };
    let mut deck = Deck::default();
    deck.add_card(
        Card::new(
            CardImage::new(solid_png([1, 2, 3, 255], 40, 56)),
            SizeClass::Standard,
        )
        .unwrap()
        .with_metadata(metadata.clone()),
    )
    .unwrap();
    // A card with a real set name keeps using the property for it
    deck.add_card(card("Rhino", CardKind::Villain, 30)).unwrap();

    let bytes = export_octgn(&deck, &OctgnOptions::default(), &RasterCodec::default()).unwrap();
    let imported = import_octgn(&bytes).unwrap();
    assert_eq!(imported.card(0).unwrap().metadata(), &metadata);
    assert_eq!(
        imported.card(1).unwrap().metadata().set.as_deref(),
        Some("Core Set")
    );
}

#[test]
fn test_set_field_colliding_with_set_name_rejected() {
    let mut colliding = card("Rhino", CardKind::Villain, 30);
    let mut metadata = colliding.metadata().clone();
    metadata
        .fields
        .insert("Set".to_string(), "Other".to_string());
    colliding = colliding.with_metadata(metadata);
    let mut deck = Deck::default();
    deck.add_card(colliding).unwrap();

    assert!(matches!(
        export_octgn(&deck, &OctgnOptions::default(), &RasterCodec::default()),
        Err(ExportError::Format(_))
    ));
}

#[test]
fn test_forced_format_and_width_reencodes() {
    let mut deck = Deck::default();
    deck.add_card(
        Card::new(
            CardImage::new(solid_png([200, 10, 10, 255], 48, 64)).with_bleed(3.0),
            SizeClass::Standard,
        )
        .unwrap(),
    )
    .unwrap();
    let options = OctgnOptions {
        image_format: Some(ImageFormat::Jpeg),
        image_width_px: Some(20),
        ..OctgnOptions::default()
    };
    let bytes = export_octgn(&deck, &options, &RasterCodec::default()).unwrap();
    let imported = import_octgn(&bytes).unwrap();
    let front = imported.card(0).unwrap().front();
    assert_eq!(ImageFormat::sniff(front.data()), Some(ImageFormat::Jpeg));
    // Bleed is cropped when re-encoding
    assert_eq!(front.bleed_mm(), 0.0);
    let decoded = image::load_from_memory(front.data()).unwrap();
    assert_eq!(decoded.width(), 20);
}

#[test]
fn test_empty_deck_rejected() {
    let result = export_octgn(
        &Deck::default(),
        &OctgnOptions::default(),
        &RasterCodec::default(),
    );
    assert!(matches!(result, Err(ExportError::EmptyDeck)));
}

#[test]
fn test_set_id_equal_to_game_id_rejected() {
    let mut deck = sample_deck();
    let options = OctgnOptions::default();
    deck.set_set_id(options.game_uuid().unwrap());
    assert!(matches!(
        export_octgn(&deck, &options, &RasterCodec::default()),
        Err(ExportError::Config(_))
    ));
}

#[test]
fn test_import_rejects_dangling_deck_line() {
    let deck = sample_deck();
    let bytes = export_octgn(&deck, &OctgnOptions::default(), &RasterCodec::default()).unwrap();

    // Rewrite the archive with a deck list naming an unknown card
    let mut source = zip::ZipArchive::new(Cursor::new(bytes.as_slice())).unwrap();
    let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
    for i in 0..source.len() {
        let mut file = source.by_index(i).unwrap();
        let name = file.name().to_string();
        let mut data = Vec::new();
        file.read_to_end(&mut data).unwrap();
        if name.ends_with(".o8d") {
            let text = String::from_utf8(data).unwrap().replacen(
                &deck.card(3).unwrap().id().to_string(),
                "00000000-0000-0000-0000-000000000000",
                1,
            );
            data = text.into_bytes();
        }
        writer
            .start_file(name, zip::write::SimpleFileOptions::default())
            .unwrap();
        std::io::Write::write_all(&mut writer, &data).unwrap();
    }
    let broken = writer.finish().unwrap().into_inner();
    assert!(matches!(import_octgn(&broken), Err(ExportError::Format(_))));
}

#[test]
fn test_import_garbage_fails() {
    assert!(import_octgn(b"not a zip").is_err());
}
