use deck_export::render::ImageCodec;
use deck_export::*;
use deck_model::{Card, CardImage, Deck, SizeClass};
use image::{Rgba, RgbaImage};
use std::io::Cursor;

fn solid_png(color: [u8; 4]) -> Vec<u8> {
    let mut buf = Vec::new();
    RgbaImage::from_pixel(40, 56, Rgba(color))
        .write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
        .unwrap();
    buf
}

fn deck_of(colors: &[[u8; 4]]) -> Deck {
    let mut deck = Deck::default();
    for color in colors {
        let card = Card::new(CardImage::new(solid_png(*color)), SizeClass::Standard)
            .unwrap()
            .with_back(Some(CardImage::new(solid_png([0, 0, 0, 255]))));
        deck.add_card(card).unwrap();
    }
    deck
}

fn small_options() -> TabletopOptions {
    TabletopOptions {
        card_width_px: 64,
        format: ImageFormat::Png,
    }
}

#[test]
fn test_empty_deck_rejected() {
    let result = export_tabletop(&Deck::default(), &small_options(), &RasterCodec::default());
    assert!(matches!(result, Err(ExportError::EmptyDeck)));
}

#[test]
fn test_too_many_cards_rejected() {
    let deck = deck_of(&[[1, 2, 3, 255]; 71]);
    let result = export_tabletop(&deck, &small_options(), &RasterCodec::default());
    assert!(matches!(
        result,
        Err(ExportError::TooManyCards { count: 71, max: 70 })
    ));
}

#[test]
fn test_sheet_taller_than_limit_rejected() {
    // 8 columns of 512 px leave 9 rows of 716 px cards
    let deck = deck_of(&[[1, 2, 3, 255]; 70]);
    let options = TabletopOptions {
        card_width_px: 512,
        ..small_options()
    };
    let result = export_tabletop(&deck, &options, &RasterCodec::default());
    assert!(matches!(result, Err(ExportError::Config(_))));
}

#[test]
fn test_sheets_sized_to_grid() {
    let deck = deck_of(&[[255, 0, 0, 255], [0, 255, 0, 255], [0, 0, 255, 255]]);
    let codec = RasterCodec::default();
    let sheets = export_tabletop(&deck, &small_options(), &codec).unwrap();

    assert_eq!((sheets.columns, sheets.rows), (3, 1));
    assert_eq!(sheets.card_count, 3);
    assert_eq!(sheets.card_width_px, 64);
    // 64 * 88.9 / 63.5
    assert_eq!(sheets.card_height_px, 89);

    let front = codec.decode(&sheets.front).unwrap();
    let back = codec.decode(&sheets.back).unwrap();
    assert_eq!(front.dimensions(), (192, 89));
    assert_eq!(back.dimensions(), (192, 89));
}

#[test]
fn test_backs_share_front_cells() {
    let deck = deck_of(&[[255, 0, 0, 255], [0, 0, 255, 255]]);
    let codec = RasterCodec::default();
    let sheets = export_tabletop(&deck, &small_options(), &codec).unwrap();
    let front = codec.decode(&sheets.front).unwrap();

    // Card order left to right on the front sheet, with no mirroring
    let left = front.get_pixel(32, 44);
    let right = front.get_pixel(96, 44);
    assert!(left.0[0] > 200 && left.0[2] < 50);
    assert!(right.0[2] > 200 && right.0[0] < 50);
}

#[test]
fn test_jpeg_output() {
    let deck = deck_of(&[[10, 10, 10, 255]]);
    let options = TabletopOptions {
        format: ImageFormat::Jpeg,
        ..small_options()
    };
    let sheets = export_tabletop(&deck, &options, &RasterCodec::default()).unwrap();
    assert_eq!(ImageFormat::sniff(&sheets.front), Some(ImageFormat::Jpeg));
}

#[tokio::test]
async fn test_save_rejects_same_path() {
    let deck = deck_of(&[[10, 10, 10, 255]]);
    let sheets = export_tabletop(&deck, &small_options(), &RasterCodec::default()).unwrap();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("sheet.png");
    assert!(sheets.save(&path, &path).await.is_err());

    let back = dir.path().join("back.png");
    sheets.save(&path, &back).await.unwrap();
    assert_eq!(std::fs::read(&back).unwrap(), sheets.back);
}
