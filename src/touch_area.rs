//! A transparent wrapper widget that feeds raw touch events to the app as
//! messages before its child sees them. While two or more fingers are down
//! (and until every finger lifts) touch events are withheld from the child,
//! so an in-progress pinch neither pans the scrollable underneath nor
//! presses a thumbnail. Mouse and keyboard events pass through untouched.

use std::collections::HashSet;

use iced::advanced::layout;
use iced::advanced::overlay;
use iced::advanced::renderer;
use iced::advanced::widget::tree::Tag;
use iced::advanced::widget::{Operation, Tree};
use iced::advanced::{Clipboard, Layout, Shell, Widget};
use iced::{touch, Element, Event, Length, Rectangle, Size, Vector};

use crate::gesture::{Phase, PointerEvent};

#[derive(Debug, Default)]
struct State {
    fingers: HashSet<touch::Finger>,
    /// Set once a second finger lands; cleared when the surface is clear.
    pinching: bool,
}

pub struct TouchArea<'a, Message, Theme = iced::Theme, Renderer = iced::Renderer> {
    content: Element<'a, Message, Theme, Renderer>,
    on_touch: Box<dyn Fn(PointerEvent) -> Message + 'a>,
}

impl<'a, Message, Theme, Renderer> TouchArea<'a, Message, Theme, Renderer> {
    pub fn new(
        content: impl Into<Element<'a, Message, Theme, Renderer>>,
        on_touch: impl Fn(PointerEvent) -> Message + 'a,
    ) -> Self {
        Self {
            content: content.into(),
            on_touch: Box::new(on_touch),
        }
    }
}

impl<Message, Theme, Renderer> Widget<Message, Theme, Renderer>
    for TouchArea<'_, Message, Theme, Renderer>
where
    Renderer: iced::advanced::Renderer,
{
    fn tag(&self) -> Tag {
        Tag::of::<State>()
    }

    fn state(&self) -> iced::advanced::widget::tree::State {
        iced::advanced::widget::tree::State::new(State::default())
    }

    fn size(&self) -> Size<Length> {
        self.content.as_widget().size()
    }

    fn children(&self) -> Vec<Tree> {
        vec![Tree::new(&self.content)]
    }

    fn diff(&self, tree: &mut Tree) {
        tree.diff_children(std::slice::from_ref(&self.content));
    }

    fn layout(
        &mut self,
        tree: &mut Tree,
        renderer: &Renderer,
        limits: &layout::Limits,
    ) -> layout::Node {
        self.content
            .as_widget_mut()
            .layout(&mut tree.children[0], renderer, limits)
    }

    fn operate(
        &mut self,
        tree: &mut Tree,
        layout: Layout<'_>,
        renderer: &Renderer,
        operation: &mut dyn Operation,
    ) {
        self.content
            .as_widget_mut()
            .operate(&mut tree.children[0], layout, renderer, operation);
    }

    fn update(
        &mut self,
        tree: &mut Tree,
        event: &Event,
        layout: Layout<'_>,
        cursor: iced::mouse::Cursor,
        renderer: &Renderer,
        clipboard: &mut dyn Clipboard,
        shell: &mut Shell<'_, Message>,
        viewport: &Rectangle,
    ) {
        if let Event::Touch(touch_event) = event {
            let state = tree.state.downcast_mut::<State>();

            let pointer = match touch_event {
                touch::Event::FingerPressed { id, position } => {
                    state.fingers.insert(*id);
                    if state.fingers.len() >= 2 {
                        state.pinching = true;
                    }
                    PointerEvent::new(id.0, Phase::Down, position.x, position.y)
                }
                touch::Event::FingerMoved { id, position } => {
                    PointerEvent::new(id.0, Phase::Move, position.x, position.y)
                }
                touch::Event::FingerLifted { id, position } => {
                    state.fingers.remove(id);
                    PointerEvent::new(id.0, Phase::Up, position.x, position.y)
                }
                touch::Event::FingerLost { id, position } => {
                    state.fingers.clear();
                    PointerEvent::new(id.0, Phase::Cancel, position.x, position.y)
                }
            };
            shell.publish((self.on_touch)(pointer));

            let withhold = state.pinching;
            if state.fingers.is_empty() {
                state.pinching = false;
            }
            if withhold {
                return;
            }
        }

        self.content.as_widget_mut().update(
            &mut tree.children[0],
            event,
            layout,
            cursor,
            renderer,
            clipboard,
            shell,
            viewport,
        );
    }

    fn draw(
        &self,
        tree: &Tree,
        renderer: &mut Renderer,
        theme: &Theme,
        style: &renderer::Style,
        layout: Layout<'_>,
        cursor: iced::mouse::Cursor,
        viewport: &Rectangle,
    ) {
        self.content.as_widget().draw(
            &tree.children[0],
            renderer,
            theme,
            style,
            layout,
            cursor,
            viewport,
        );
    }

    fn mouse_interaction(
        &self,
        tree: &Tree,
        layout: Layout<'_>,
        cursor: iced::mouse::Cursor,
        viewport: &Rectangle,
        renderer: &Renderer,
    ) -> iced::mouse::Interaction {
        self.content
            .as_widget()
            .mouse_interaction(&tree.children[0], layout, cursor, viewport, renderer)
    }

    fn overlay<'b>(
        &'b mut self,
        tree: &'b mut Tree,
        layout: Layout<'b>,
        renderer: &Renderer,
        viewport: &Rectangle,
        translation: Vector,
    ) -> Option<overlay::Element<'b, Message, Theme, Renderer>> {
        self.content.as_widget_mut().overlay(
            &mut tree.children[0],
            layout,
            renderer,
            viewport,
            translation,
        )
    }
}

impl<'a, Message, Theme, Renderer> From<TouchArea<'a, Message, Theme, Renderer>>
    for Element<'a, Message, Theme, Renderer>
where
    Message: 'a,
    Theme: 'a,
    Renderer: iced::advanced::Renderer + 'a,
{
    fn from(area: TouchArea<'a, Message, Theme, Renderer>) -> Self {
        Element::new(area)
    }
}
