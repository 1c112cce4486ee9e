use std::collections::HashSet;

use modelgen::errors::GenError;
use modelgen::introspect::Introspect;
use modelgen::module_codegen::type_gen::ignore_regex;
use modelgen::module_codegen::{EmitOptions, OutputUnit};
use modelgen::parser::method::{MethodOptions, ReturnShape};
use modelgen::parser::IntrospectParser;
use modelgen::run_emit::{generate, DirectorySink, GenerateOptions};

const FIXTURE: &[u8] = include_bytes!("fixtures/introspect.json");

fn fixture() -> Introspect {
    Introspect::from_slice(FIXTURE).unwrap()
}

fn options() -> GenerateOptions {
    let ignored = vec![
        "Item.Fields.Base".to_owned(),
        "Array.Integer".to_owned(),
        "Array.String".to_owned(),
    ];
    GenerateOptions {
        emit: EmitOptions {
            ignored_types: ignore_regex(&ignored).unwrap(),
            ..EmitOptions::default()
        },
        ..GenerateOptions::default()
    }
}

fn unit<'a>(units: &'a [OutputUnit], name: &str) -> &'a str {
    &units
        .iter()
        .find(|u| u.name == name)
        .unwrap_or_else(|| panic!("no unit named {}", name))
        .content
}

/// Text of one class, from its declaration up to the next top level class.
fn class_body<'a>(source: &'a str, declaration: &str) -> &'a str {
    let start = source.find(declaration).unwrap_or_else(|| panic!("missing {}", declaration));
    let rest = &source[start + declaration.len()..];
    let end = rest.find("\n\t/**").unwrap_or(rest.len());
    &rest[..end]
}

#[test]
fn every_namespace_gets_one_unit() {
    let units = generate(&fixture(), &options()).unwrap();

    let mut names: Vec<_> = units.iter().map(|u| u.name.as_str()).collect();
    names.sort_unstable();
    assert_eq!(
        names,
        vec![
            "AudioLibrary",
            "AudioModel",
            "Files",
            "GlobalModel",
            "ItemModel",
            "JSONRPC",
            "ListModel",
            "MediaModel",
            "Player",
            "Playlist",
            "PlaylistModel",
            "VideoModel",
        ]
    );

    for unit in &units {
        assert!(unit.content.starts_with("// Auto Generated file, do not modify\n"));
        assert!(unit.content.contains(&format!("public final class {} {{", unit.name)));
    }
}

#[test]
fn resolved_names_are_unique() {
    let mut parser = IntrospectParser::new(MethodOptions::default());
    parser.parse_introspect(&fixture(), false).unwrap();

    let mut seen = HashSet::new();
    for type_id in parser.resolver.globals() {
        let resolved = parser.resolver.get(type_id).resolved.clone().unwrap();
        assert!(
            seen.insert((resolved.namespace.clone(), resolved.name.clone())),
            "{}.{} used twice",
            resolved.namespace,
            resolved.name
        );
    }

    let album = parser.resolver.lookup("Audio.Details.Album").unwrap();
    assert_eq!(parser.resolver.get(album).resolved.as_ref().unwrap().name, "AlbumDetails");
}

#[test]
fn serialization_follows_declaration_order() {
    let units = generate(&fixture(), &options()).unwrap();
    let time = class_body(unit(&units, "GlobalModel"), "public static class Time extends AbstractModel {");

    let parsed: Vec<_> = ["hours", "minutes", "seconds", "milliseconds"]
        .iter()
        .map(|key| time.find(&format!("{} = obj.getInt(\"{}\");", key, key)).unwrap())
        .collect();
    let serialized: Vec<_> = ["hours", "minutes", "seconds", "milliseconds"]
        .iter()
        .map(|key| time.find(&format!("obj.put(\"{}\", {});", key, key)).unwrap())
        .collect();

    assert!(parsed.windows(2).all(|w| w[0] < w[1]));
    assert!(serialized.windows(2).all(|w| w[0] < w[1]));
    assert!(time.contains("public Time(int hours, int minutes, int seconds, int milliseconds) {"));
}

#[test]
fn inheritance_chain_uses_parent_classes() {
    let units = generate(&fixture(), &options()).unwrap();
    let audio = unit(&units, "AudioModel");
    let media = unit(&units, "MediaModel");

    assert!(media.contains("public static class BaseDetails extends ItemModel.BaseDetails {"));
    assert!(audio.contains("public static class BaseDetails extends MediaModel.BaseDetails {"));
    assert!(audio.contains("public static class AlbumDetails extends AudioModel.BaseDetails {"));
    assert!(audio.contains("genre = getStringArray(obj, \"genre\");"));
    assert!(audio.contains("albumid = obj.getInt(\"albumid\");"));
    assert!(audio.contains("rating = parseDouble(obj, \"rating\");"));

    let album = class_body(audio, "public static class AlbumDetails extends AudioModel.BaseDetails {");
    assert!(album.contains("super(obj);"));
    assert!(album.contains("final JSONObject obj = super.toJSONObject();"));
}

#[test]
fn multiple_inheritance_keeps_the_first_parent() {
    let mut parser = IntrospectParser::new(MethodOptions::default());
    parser.parse_introspect(&fixture(), false).unwrap();

    let file = parser.resolver.lookup("Video.Details.File").unwrap();
    let parent = parser.resolver.parent_of(file).unwrap().unwrap();
    assert_eq!(parser.resolver.get(parent).id.as_deref(), Some("Video.Details.Item"));
    assert_eq!(parser.resolver.notices().len(), 1);
    assert_eq!(parser.resolver.notices()[0].dropped, vec!["Media.Details.Base".to_owned()]);

    let units = generate(&fixture(), &options()).unwrap();
    assert!(unit(&units, "VideoModel").contains("public static class FileDetails extends VideoModel.ItemDetails {"));
}

#[test]
fn inline_shapes_become_inner_classes() {
    let units = generate(&fixture(), &options()).unwrap();
    let video = unit(&units, "VideoModel");

    assert!(video.contains("public static class Cast extends AbstractModel {"));
    assert!(video.contains("cast = VideoModel.Cast.getVideoModelCastList(obj, \"cast\");"));
    assert!(video.contains("public static class PositionTotal {"));
    assert!(video.contains("resume = obj.has(\"resume\") ? new PositionTotal(obj.getJSONObject(\"resume\")) : null;"));
}

#[test]
fn union_types_get_narrowings() {
    let units = generate(&fixture(), &options()).unwrap();
    let playlist = unit(&units, "PlaylistModel");

    assert!(playlist.contains("public static class Item extends AbstractModel {"));
    assert!(playlist.contains("public static class File extends Item {"));
    assert!(playlist.contains("public static class Albumid extends Item {"));

    let calls = unit(&units, "Playlist");
    assert!(calls.contains("public Add(int playlistid, PlaylistModel.Item item) {"));
}

#[test]
fn calls_unwrap_their_results() {
    let mut parser = IntrospectParser::new(MethodOptions::default());
    parser.parse_introspect(&fixture(), false).unwrap();
    let get_albums = &parser.methods["AudioLibrary"]["GetAlbums"];
    assert!(matches!(get_albums.return_shape, ReturnShape::List(_)));
    assert_eq!(get_albums.return_attribute_key.as_deref(), Some("albums"));

    let units = generate(&fixture(), &options()).unwrap();
    let audio = unit(&units, "AudioLibrary");
    assert!(audio.contains("public static class GetAlbums extends AbstractCall<AudioModel.AlbumDetails> {"));
    assert!(audio.contains("public GetAlbums(Integer artistid, String... properties) {"));
    assert!(audio.contains("public GetAlbums setSort(ListModel.Sort sort) {"));
    assert!(audio.contains("public static class GetAlbumDetails extends AbstractCall<AudioModel.AlbumDetails> {"));
    assert!(audio.contains("public final static String RESULT = \"albumdetails\";"));
    assert!(audio.contains("* @param albumid Album to look up"));

    let player = unit(&units, "Player");
    assert!(player.contains("public static class GetPosition extends AbstractCall<PercentageTime> {"));
    assert!(player.contains("public static class PercentageTime {"));
    assert!(player.contains("time = new GlobalModel.Time(obj.getJSONObject(\"time\"));"));

    let files = unit(&units, "Files");
    assert!(files.contains("public GetDirectory(String directory, Boolean recursive) {"));
    assert!(files.contains("public GetDirectory(String directory, Integer recursive) {"));
    assert!(files.contains("extends AbstractCall<JSONObject>"));

    assert!(unit(&units, "JSONRPC").contains("return obj.getString(RESULT);"));
}

#[test]
fn skipped_methods_leave_only_models() {
    let options = GenerateOptions {
        skip_methods: true,
        ..options()
    };

    let units = generate(&fixture(), &options).unwrap();

    assert!(units.iter().all(|u| u.name.ends_with("Model")));
}

#[test]
fn missing_id_aborts_before_output() {
    let broken: Introspect = serde_json::from_value(serde_json::json!({
        "types": {
            "Library.Id": { "id": "Library.Id", "type": "integer" },
            "Audio.Details.Album": { "type": "object", "properties": { "title": { "type": "string" } } }
        }
    }))
    .unwrap();

    let err = generate(&broken, &options()).unwrap_err();

    assert!(matches!(err, GenError::SchemaStructure { .. }));
}

#[test]
fn two_array_parameters_are_unsupported() {
    let broken: Introspect = serde_json::from_value(serde_json::json!({
        "types": {},
        "methods": {
            "Playlist.Insert": {
                "params": [
                    { "name": "songs", "type": "array", "items": { "type": "integer" } },
                    { "name": "albums", "type": "array", "items": { "type": "integer" } }
                ],
                "returns": { "type": "string" }
            }
        }
    }))
    .unwrap();

    let err = generate(&broken, &options()).unwrap_err();

    assert!(matches!(err, GenError::UnsupportedShape { .. }));
}

#[tokio::test]
async fn sink_writes_every_unit() {
    let dir = tempfile::tempdir().unwrap();
    let units = generate(&fixture(), &options()).unwrap();

    let sink = DirectorySink::open(dir.path(), "java").await.unwrap();
    for unit in &units {
        sink.write(unit).await.unwrap();
    }

    let written = std::fs::read_dir(dir.path()).unwrap().count();
    assert_eq!(written, units.len());
    let player = std::fs::read_to_string(dir.path().join("Player.java")).unwrap();
    assert!(player.contains("package org.xbmc.android.jsonrpc.api.model;"));
}

#[tokio::test]
async fn sink_rejects_a_missing_directory() {
    let dir = tempfile::tempdir().unwrap();

    let err = DirectorySink::open(dir.path().join("absent"), "java").await.unwrap_err();

    assert!(matches!(err, GenError::Io { .. }));
    assert!(!dir.path().join("absent").exists());
}
