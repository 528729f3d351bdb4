use crate::runtime::{
    error::Fault,
    numbering::Word,
    value::{Frame, Value},
};

use super::{Control, Machine};

impl Machine<'_> {
    /// Delivers an operation request to the nearest enclosing handler for
    /// `ability`.
    ///
    /// The frames above that handler's delimiter become the request's
    /// continuation; the delimiter itself is dropped, so a handler that wants
    /// to keep handling resumes the continuation inside a new `handle`.
    pub(super) fn request(&mut self, ability: Word, tag: u32, args: Vec<Value>) -> Result<Control, Fault> {
        let delimiter = self.stack.iter().rposition(|frame| {
            matches!(frame, Frame::Delimit { abilities, .. } if abilities.contains(&ability))
        });
        let Some(position) = delimiter else {
            return Err(Fault::UnhandledRequest { ability, tag, args });
        };

        let captured = self.stack.split_off(position + 1);
        let handler = match self.stack.pop() {
            Some(Frame::Delimit { handler, .. }) => handler,
            _ => return Err(Fault::Runtime("handler delimiter vanished".to_string())),
        };
        let request = Value::Request {
            ability,
            tag,
            args: args.into(),
            continuation: captured.into(),
        };
        self.apply(handler, vec![request])
    }

    /// Reinstates captured frames and returns the first argument into them.
    /// Extra arguments are applied to whatever the continuation produces.
    pub(super) fn resume_continuation(
        &mut self,
        frames: &[Frame],
        mut args: Vec<Value>,
    ) -> Result<Control, Fault> {
        if args.is_empty() {
            return Err(Fault::Runtime(
                "continuation resumed without a value".to_string(),
            ));
        }
        let rest = args.split_off(1);
        if !rest.is_empty() {
            self.push_frame(Frame::Apply { args: rest })?;
        }
        if self.stack.len() + frames.len() > self.max_frames {
            return Err(Fault::StackOverflow(self.max_frames));
        }
        self.stack.extend(frames.iter().cloned());
        Ok(Control::Return(args.remove(0)))
    }
}
