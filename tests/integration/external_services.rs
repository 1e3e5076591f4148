/// Tool calls against fake scoring and music generation APIs
use music_toolkit_mcp::*;
use serde_json::{json, Value};
use tempfile::TempDir;
use wiremock::matchers::{header_exists, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use super::{fake_wav, test_config};

/// Call a tool through the server's dispatcher and return the result object
async fn call_tool(server: &MusicToolkitServer, name: &str, arguments: Value) -> Value {
    let response = server
        .dispatcher()
        .handle_value(json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": "tools/call",
            "params": {"name": name, "arguments": arguments}
        }))
        .await
        .expect("Expected a response");

    assert!(response.error.is_none(), "unexpected error: {:?}", response.error);
    response.result.expect("Expected a result")
}

fn text_of(result: &Value) -> String {
    result["content"][0]["text"].as_str().expect("text content").to_string()
}

#[cfg(test)]
mod external_service_tests {
    use super::*;

    #[tokio::test]
    async fn test_wav_to_score_embeds_rendered_svg() {
        let mock = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/render"))
            .and(header_exists("content-type"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"svg": "<svg/>"})))
            .expect(1)
            .mount(&mock)
            .await;

        let temp = TempDir::new().unwrap();
        let config = test_config(&temp).with_score_api(format!("{}/render", mock.uri()));
        let server = MusicToolkitServer::new(config).unwrap();
        let wav = fake_wav(&temp, "melody.wav");

        let result = call_tool(
            &server,
            "wav_to_music_score",
            json!({"wav_file_path": wav.to_string_lossy()}),
        )
        .await;

        let text = text_of(&result);
        assert!(text.contains("🎼 Score rendered successfully as SVG"));
        assert!(text.contains("data:image/svg+xml;base64,PHN2Zy8+"));
        assert_eq!(result["isError"], json!(false));
    }

    #[tokio::test]
    async fn test_scoring_api_error_is_folded_into_text() {
        let mock = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/render"))
            .respond_with(ResponseTemplate::new(500).set_body_string("verovio crashed"))
            .mount(&mock)
            .await;

        let temp = TempDir::new().unwrap();
        let config = test_config(&temp).with_score_api(format!("{}/render", mock.uri()));
        let server = MusicToolkitServer::new(config).unwrap();
        let wav = fake_wav(&temp, "melody.wav");

        let result = call_tool(
            &server,
            "wav_to_music_score",
            json!({"wav_file_path": wav.to_string_lossy(), "render_svg": true}),
        )
        .await;

        let text = text_of(&result);
        assert!(text.starts_with("✅"));
        assert!(text.contains("SVG rendering failed"));
        assert!(text.contains("API error 500: verovio crashed"));
    }

    #[tokio::test]
    async fn test_scoring_api_without_svg_field() {
        let mock = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"pages": 1})))
            .mount(&mock)
            .await;

        let temp = TempDir::new().unwrap();
        let config = test_config(&temp).with_score_api(mock.uri());
        let server = MusicToolkitServer::new(config).unwrap();
        let wav = fake_wav(&temp, "melody.wav");

        let result = call_tool(&server, "wav_to_music_score", json!({"wav_file_path": wav.to_string_lossy()})).await;

        let text = text_of(&result);
        assert!(text.contains("Failed to parse SVG"));
    }

    #[tokio::test]
    async fn test_unreachable_scoring_api_degrades() {
        let temp = TempDir::new().unwrap();
        // Nothing listens on the discard port
        let config = test_config(&temp).with_score_api("http://127.0.0.1:9/render");
        let server = MusicToolkitServer::new(config).unwrap();
        let wav = fake_wav(&temp, "melody.wav");

        let result = call_tool(&server, "wav_to_music_score", json!({"wav_file_path": wav.to_string_lossy()})).await;

        let text = text_of(&result);
        assert!(text.starts_with("✅"));
        assert!(text.contains("SVG rendering failed"));
    }

    #[tokio::test]
    async fn test_humming_streams_raw_audio_to_file() {
        let audio = b"RIFF\x10\x00\x00\x00WAVEgenerated-audio".to_vec();
        let mock = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/generate"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "audio/wav")
                    .set_body_bytes(audio.clone()),
            )
            .expect(1)
            .mount(&mock)
            .await;

        let temp = TempDir::new().unwrap();
        let config = test_config(&temp).with_musicgen_api(format!("{}/generate", mock.uri()));
        let server = MusicToolkitServer::new(config).unwrap();
        let hum = fake_wav(&temp, "hum.wav");

        let result = call_tool(
            &server,
            "generate_music_from_humming",
            json!({"humming_file_path": hum.to_string_lossy(), "style_prompt": "classical piano piece"}),
        )
        .await;

        let text = text_of(&result);
        assert!(text.starts_with("✅ Successfully generated music from humming"));
        assert!(text.contains("🎵 Style: classical piano piece"));

        let files = server.dispatcher().tools().output.list().await.unwrap();
        assert_eq!(files.len(), 1);
        assert!(text.contains(&files[0].path.display().to_string()));
        assert_eq!(std::fs::read(&files[0].path).unwrap(), audio);
    }

    #[tokio::test]
    async fn test_humming_follows_audio_url() {
        let mock = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/generate"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"audio_url": format!("{}/files/out.wav", mock.uri())})),
            )
            .mount(&mock)
            .await;
        Mock::given(method("GET"))
            .and(path("/files/out.wav"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"RIFFfromurl".to_vec()))
            .expect(1)
            .mount(&mock)
            .await;

        let temp = TempDir::new().unwrap();
        let config = test_config(&temp).with_musicgen_api(format!("{}/generate", mock.uri()));
        let server = MusicToolkitServer::new(config).unwrap();
        let hum = fake_wav(&temp, "hum.wav");

        let result = call_tool(
            &server,
            "generate_music_from_humming",
            json!({"humming_file_path": hum.to_string_lossy(), "style_prompt": "lofi"}),
        )
        .await;

        assert!(text_of(&result).starts_with("✅"));
        let files = server.dispatcher().tools().output.list().await.unwrap();
        assert_eq!(files.len(), 1);
        assert_eq!(std::fs::read(&files[0].path).unwrap(), b"RIFFfromurl".to_vec());
    }

    #[tokio::test]
    async fn test_humming_api_error_is_soft_failure() {
        let mock = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503).set_body_string("model is cold"))
            .mount(&mock)
            .await;

        let temp = TempDir::new().unwrap();
        let config = test_config(&temp).with_musicgen_api(mock.uri());
        let server = MusicToolkitServer::new(config).unwrap();
        let hum = fake_wav(&temp, "hum.wav");

        let result = call_tool(
            &server,
            "generate_music_from_humming",
            json!({"humming_file_path": hum.to_string_lossy(), "style_prompt": "ambient"}),
        )
        .await;

        let text = text_of(&result);
        assert_eq!(text, "❌ API error 503: model is cold");
        assert_eq!(result["isError"], json!(true));

        // No partial output is left behind
        assert!(server.dispatcher().tools().output.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_humming_json_without_audio_url() {
        let mock = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "queued"})))
            .mount(&mock)
            .await;

        let temp = TempDir::new().unwrap();
        let config = test_config(&temp).with_musicgen_api(mock.uri());
        let server = MusicToolkitServer::new(config).unwrap();
        let hum = fake_wav(&temp, "hum.wav");

        let result = call_tool(
            &server,
            "generate_music_from_humming",
            json!({"humming_file_path": hum.to_string_lossy(), "style_prompt": "ambient"}),
        )
        .await;

        let text = text_of(&result);
        assert!(text.starts_with("❌ Music generation failed"));
        assert!(text.contains("audio_url"));
    }

    #[tokio::test]
    async fn test_humming_with_score_renders_generated_audio() {
        let mock = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/generate"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"RIFFsong".to_vec()))
            .mount(&mock)
            .await;
        Mock::given(method("POST"))
            .and(path("/render"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"svg": "<svg/>"})))
            .mount(&mock)
            .await;

        let temp = TempDir::new().unwrap();
        let config = test_config(&temp)
            .with_musicgen_api(format!("{}/generate", mock.uri()))
            .with_score_api(format!("{}/render", mock.uri()));
        let server = MusicToolkitServer::new(config).unwrap();
        let hum = fake_wav(&temp, "hum.wav");

        let result = call_tool(
            &server,
            "generate_music_from_humming",
            json!({
                "humming_file_path": hum.to_string_lossy(),
                "style_prompt": "folk ballad",
                "generate_score": true
            }),
        )
        .await;

        let text = text_of(&result);
        assert!(text.contains("🎼 Music score generated:"));
        assert!(text.contains("🎼 Score rendered as SVG:"));
        assert!(text.contains("data:image/svg+xml;base64,"));
    }
}
