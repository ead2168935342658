use pretty_assertions::assert_eq;
use treegpt_conversation::{
    parse_archive, reply_pairs, Author, ConversationLinearizer, Fragment, Message, MessageStore,
    TraversalOutcome,
};

const EXPORT: &str = r#"[
  {
    "title": "Greeting",
    "conversation_id": "conv-1",
    "current_node": "n-assistant",
    "mapping": {
      "n-root": {"id": "n-root", "message": null, "parent": null, "children": ["n-system"]},
      "n-system": {
        "id": "n-system",
        "message": {
          "author": {"role": "system"},
          "metadata": {},
          "content": {"content_type": "text", "parts": [""]}
        },
        "parent": "n-root",
        "children": ["n-user"]
      },
      "n-user": {
        "id": "n-user",
        "message": {
          "author": {"role": "user"},
          "metadata": {},
          "content": {"content_type": "text", "parts": ["Hi"]}
        },
        "parent": "n-system",
        "children": ["n-assistant", "n-regenerated"]
      },
      "n-regenerated": {
        "id": "n-regenerated",
        "message": {
          "author": {"role": "assistant"},
          "metadata": {},
          "content": {"content_type": "text", "parts": ["Hey."]}
        },
        "parent": "n-user",
        "children": []
      },
      "n-assistant": {
        "id": "n-assistant",
        "message": {
          "author": {"role": "assistant"},
          "metadata": {},
          "content": {"content_type": "text", "parts": ["Hello!"]}
        },
        "parent": "n-user",
        "children": []
      }
    }
  },
  {
    "title": "Voice",
    "conversation_id": "conv-2",
    "current_node": "v-answer",
    "mapping": {
      "v-question": {
        "id": "v-question",
        "message": {
          "author": {"role": "user"},
          "metadata": {},
          "content": {
            "content_type": "multimodal_text",
            "parts": [
              {"content_type": "audio_transcription", "text": "what is rust"},
              {
                "content_type": "real_time_user_audio_video_asset_pointer",
                "audio_asset_pointer": {"content_type": "audio_asset_pointer", "asset_pointer": "sediment://a"},
                "video_container_asset_pointer": null,
                "frames_asset_pointers": []
              }
            ]
          }
        },
        "parent": null,
        "children": ["v-answer"]
      },
      "v-answer": {
        "id": "v-answer",
        "message": {
          "author": {"role": "assistant"},
          "metadata": {},
          "content": {"content_type": "text", "parts": ["A systems language."]}
        },
        "parent": "v-question",
        "children": []
      }
    }
  },
  {
    "title": "Broken",
    "conversation_id": "conv-3",
    "current_node": "gone",
    "mapping": {}
  }
]"#;

fn ingest() -> (MessageStore, Vec<TraversalOutcome>) {
    let conversations = parse_archive(EXPORT.as_bytes()).expect("valid export");
    let linearizer = ConversationLinearizer::new();
    let mut store = MessageStore::new();
    let mut outcomes = Vec::new();
    for conversation in &conversations {
        let linearized = linearizer.linearize(conversation);
        outcomes.push(linearized.outcome);
        store.add_all(linearized.messages);
    }
    (store, outcomes)
}

#[test]
fn active_branch_only() {
    let (store, outcomes) = ingest();

    let ids: Vec<&str> = store
        .get_by_conversation("conv-1")
        .into_iter()
        .map(Message::id)
        .collect();
    assert_eq!(ids, vec!["n-user", "n-assistant"]);
    assert!(store.get_by_id("n-regenerated").is_none());
    assert!(store.get_by_id("n-system").is_none());

    assert_eq!(
        outcomes,
        vec![
            TraversalOutcome::Complete,
            TraversalOutcome::Complete,
            TraversalOutcome::MissingNode("gone".to_string()),
        ]
    );
}

#[test]
fn pairs_and_text() {
    let (store, _) = ingest();
    let pairs: Vec<_> = reply_pairs(&store).collect();
    assert_eq!(pairs.len(), 2);

    let greeting = &pairs[0];
    assert_eq!(greeting.reply.id(), "n-assistant");
    let context = greeting.context.expect("user context");
    assert_eq!(context.id(), "n-user");
    assert_eq!(format!("{}\n{}", context.text(), greeting.reply.text()), "Hi\nHello!");
    assert_eq!(
        context.children_ids().to_vec(),
        vec!["n-assistant".to_string(), "n-regenerated".to_string()]
    );
}

#[test]
fn voice_parts_are_classified() {
    let (store, _) = ingest();
    let question = store.get_by_id("v-question").expect("voice question");
    assert_eq!(question.author(), &Author::User);
    assert_eq!(question.parts().len(), 2);
    assert_eq!(
        question.parts()[0],
        Fragment::Transcript("what is rust".to_string())
    );
    assert!(matches!(question.parts()[1], Fragment::Asset(_)));
    // Transcripts are not text fragments.
    assert_eq!(question.text(), "");
    assert_eq!(question.conversation_title(), "Voice");
}

#[test]
fn damaged_nodes_do_not_drop_the_conversation() {
    let raw = r#"[{
      "title": "Damaged",
      "conversation_id": "conv-d",
      "current_node": "d-reply",
      "mapping": {
        "d-root": {
          "id": "d-root", "parent": null, "children": ["d-user"],
          "message": {"author": {}, "content": {"content_type": "text", "parts": ["lost"]}}
        },
        "d-user": {
          "id": "d-user", "parent": "d-root", "children": null,
          "message": {"author": {"role": "user"}, "content": {"content_type": "text", "parts": ["Hi"]}}
        },
        "d-reply": {
          "id": "d-reply", "parent": "d-user", "children": [],
          "message": {"author": {"role": "assistant"}, "content": {"content_type": "text", "parts": ["Hello!"]}}
        },
        "d-abandoned": {
          "id": "d-abandoned", "parent": "d-user", "children": null,
          "message": {"author": {}, "content": {"content_type": null, "parts": null}}
        }
      }
    }]"#;

    let conversations = parse_archive(raw.as_bytes()).expect("valid export");
    assert_eq!(conversations.len(), 1);

    let linearized = ConversationLinearizer::new().linearize(&conversations[0]);
    assert_eq!(linearized.outcome, TraversalOutcome::Complete);
    assert_eq!(linearized.nodes_visited, 3);
    let ids: Vec<&str> = linearized.messages.iter().map(Message::id).collect();
    assert_eq!(ids, vec!["d-user", "d-reply"]);

    let mut store = MessageStore::new();
    store.add_all(linearized.messages);
    let pairs: Vec<_> = reply_pairs(&store).collect();
    assert_eq!(pairs.len(), 1);
    assert_eq!(pairs[0].context.map(Message::id), Some("d-user"));
}
