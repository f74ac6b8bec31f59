// Copyright 2025 Eric Jingryd (tidynest@proton.me)
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! X11 keysym values used by name resolution, capture and synthesis
//!
//! Values from `X11/keysymdef.h` and `X11/XF86keysym.h`.

use crate::core::types::Modifier;

pub const SPACE: u32 = 0x0020;
pub const PLUS: u32 = 0x002b;
pub const AT: u32 = 0x0040;
pub const LOWER_A: u32 = 0x0061;

pub const BACKSPACE: u32 = 0xff08;
pub const TAB: u32 = 0xff09;
pub const RETURN: u32 = 0xff0d;
pub const PAUSE: u32 = 0xff13;
pub const SCROLL_LOCK: u32 = 0xff14;
pub const ESCAPE: u32 = 0xff1b;
pub const HOME: u32 = 0xff50;
pub const LEFT: u32 = 0xff51;
pub const UP: u32 = 0xff52;
pub const RIGHT: u32 = 0xff53;
pub const DOWN: u32 = 0xff54;
pub const PAGE_UP: u32 = 0xff55;
pub const PAGE_DOWN: u32 = 0xff56;
pub const END: u32 = 0xff57;
pub const PRINT: u32 = 0xff61;
pub const INSERT: u32 = 0xff63;
pub const MENU: u32 = 0xff67;
pub const NUM_LOCK: u32 = 0xff7f;
pub const KP_ENTER: u32 = 0xff8d;
pub const KP_0: u32 = 0xffb0;
pub const ISO_LEFT_TAB: u32 = 0xfe20;
pub const DELETE: u32 = 0xffff;

pub const F1: u32 = 0xffbe;
pub const F2: u32 = 0xffbf;
pub const F3: u32 = 0xffc0;
pub const F12: u32 = 0xffc9;
pub const F24: u32 = 0xffd5;

pub const SHIFT_L: u32 = 0xffe1;
pub const SHIFT_R: u32 = 0xffe2;
pub const CONTROL_L: u32 = 0xffe3;
pub const CONTROL_R: u32 = 0xffe4;
pub const CAPS_LOCK: u32 = 0xffe5;
pub const META_L: u32 = 0xffe7;
pub const META_R: u32 = 0xffe8;
pub const ALT_L: u32 = 0xffe9;
pub const ALT_R: u32 = 0xffea;
pub const SUPER_L: u32 = 0xffeb;
pub const SUPER_R: u32 = 0xffec;

pub const XF86_AUDIO_LOWER_VOLUME: u32 = 0x1008_ff11;
pub const XF86_AUDIO_MUTE: u32 = 0x1008_ff12;
pub const XF86_AUDIO_RAISE_VOLUME: u32 = 0x1008_ff13;
pub const XF86_AUDIO_PLAY: u32 = 0x1008_ff14;
pub const XF86_AUDIO_STOP: u32 = 0x1008_ff15;
pub const XF86_AUDIO_PREV: u32 = 0x1008_ff16;
pub const XF86_AUDIO_NEXT: u32 = 0x1008_ff17;

/// Offset of Unicode keysyms above Latin-1
pub const UNICODE_OFFSET: u32 = 0x0100_0000;

/// Modifier a keysym drives, if it is a modifier key
pub fn modifier_of(keysym: u32) -> Option<Modifier> {
    match keysym {
        SHIFT_L | SHIFT_R => Some(Modifier::Shift),
        CONTROL_L | CONTROL_R => Some(Modifier::Ctrl),
        ALT_L | ALT_R | META_L | META_R => Some(Modifier::Alt),
        SUPER_L | SUPER_R => Some(Modifier::Super),
        _ => None,
    }
}

/// Left-hand keysym used to press a modifier
pub const fn modifier_keysym(modifier: Modifier) -> u32 {
    match modifier {
        Modifier::Shift => SHIFT_L,
        Modifier::Ctrl => CONTROL_L,
        Modifier::Alt => ALT_L,
        Modifier::Super => SUPER_L,
    }
}
