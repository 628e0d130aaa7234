//! Content page view - renders one page record according to its layout.

use gtk4 as gtk;
use gtk4::prelude::*;

use signal_kiosk::content::{MediaKind, MediaRef, PageContent, PageLayout};

/// Area of the window showing the current page
pub struct PageView {
    pub container: gtk::Box,
}

impl PageView {
    pub fn new() -> Self {
        let container = gtk::Box::new(gtk::Orientation::Vertical, 24);
        container.add_css_class("page");
        container.set_hexpand(true);
        container.set_vexpand(true);
        container.set_valign(gtk::Align::Center);

        let waiting = gtk::Label::new(Some("Waiting for signal..."));
        waiting.add_css_class("page-waiting");
        container.append(&waiting);

        Self { container }
    }

    /// Replace the current page with `content`
    pub fn render(&self, signal_id: u8, content: &PageContent) {
        log::debug!("Rendering page {} ({:?})", signal_id, content.layout);

        while let Some(child) = self.container.first_child() {
            self.container.remove(&child);
        }

        if content.layout != PageLayout::MediaOnly {
            let title = gtk::Label::new(Some(&content.title));
            title.add_css_class("page-title");
            title.set_wrap(true);
            self.container.append(&title);

            if !content.subtitle.is_empty() {
                let subtitle = gtk::Label::new(Some(&content.subtitle));
                subtitle.add_css_class("page-subtitle");
                self.container.append(&subtitle);
            }
        }

        let body_orientation = if content.layout == PageLayout::TextAndMedia {
            gtk::Orientation::Horizontal
        } else {
            gtk::Orientation::Vertical
        };
        let body = gtk::Box::new(body_orientation, 24);
        body.set_halign(gtk::Align::Center);
        body.set_vexpand(content.layout.shows_media());

        if content.layout.shows_text() && !content.text_content.is_empty() {
            let text = gtk::Label::new(Some(&content.text_content));
            text.add_css_class("page-text");
            text.set_wrap(true);
            text.set_justify(gtk::Justification::Center);
            body.append(&text);
        }

        if content.layout.shows_media() {
            for media in &content.media {
                body.append(&media_widget(media));
            }
        }

        if body.first_child().is_some() {
            self.container.append(&body);
        }
    }
}

fn media_widget(media: &MediaRef) -> gtk::Widget {
    let file = gtk::gio::File::for_path(&media.path);

    match media.kind {
        MediaKind::Image => {
            let picture = gtk::Picture::for_file(&file);
            picture.set_content_fit(gtk::ContentFit::Contain);
            picture.set_hexpand(true);
            picture.set_vexpand(true);
            picture.upcast()
        }
        MediaKind::Video => {
            let video = gtk::Video::for_file(Some(&file));
            video.set_autoplay(true);
            video.set_loop(true);
            video.set_hexpand(true);
            video.set_vexpand(true);
            video.upcast()
        }
    }
}
