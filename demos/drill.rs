use std::path::PathBuf;

use tone_drill::{DictionaryTranscriber, Drill, Ruby, SpeechCascade, ToneDigit, ToneStyle};

const LYRICS: &str = "告白气球\n你的眼睛 在说我愿意";

const READINGS: &str = r#"{
    "告": "gao4", "白": "bai2", "气": "qi4", "球": "qiu2",
    "你": "ni3", "的": "de5", "眼": "yan3", "睛": "jing1",
    "在": "zai4", "说": "shuo1", "我": "wo3", "愿": "yuan4", "意": "yi4"
}"#;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let dict = DictionaryTranscriber::from_json_str(READINGS)?;
    let mut drill = Drill::build(LYRICS, &dict);

    for line in &drill.lines {
        let reading: Vec<String> = line
            .annotate(ToneStyle::Marks)
            .into_iter()
            .filter_map(|ruby| match ruby {
                Ruby::Annotated { reading, .. } => Some(reading),
                Ruby::Text(_) => None,
            })
            .collect();
        println!("{}  {}", line.text(), reading.join(" "));
    }

    // A learner who answers first tone everywhere.
    let count = drill.syllables().count();
    for index in 0..count {
        drill.assign(index, ToneDigit::First);
    }
    let shown: Vec<String> = drill.syllables().map(|s| s.display_text()).collect();
    println!("Answers: {}", shown.join(" "));
    println!("Score: {}", drill.score());

    drill.reset();
    println!("After reset: {}", drill.score());

    let mut cascade = SpeechCascade::new();
    #[cfg(feature = "piper")]
    cascade.push(tone_drill::engines::piper::PiperBackend::default());
    #[cfg(feature = "remote")]
    cascade.push(tone_drill::engines::http::HttpBackend::local_bridge());

    if let Some(text) = drill.line_text(0) {
        match cascade.speak(&text) {
            Ok(spoken) => {
                spoken.audio.write_wav(&PathBuf::from("line.wav"))?;
                println!(
                    "Spoke line 1 with {} ({:.2}s), saved to line.wav",
                    spoken.backend,
                    spoken.audio.duration_secs()
                );
            }
            Err(err) => println!("Speech unavailable: {err}"),
        }
    }

    Ok(())
}
