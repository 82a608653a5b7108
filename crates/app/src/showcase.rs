use clap::ValueEnum;
use toastbox_core::toast::binding::Bindings;
use toastbox_core::toast::element::{
    Button, ButtonStyle, Group, Image, ImagePlacement, Progress, Select, Subgroup, Text,
    TextStyle,
};
use toastbox_core::toast::entity::{Scenario, Toast};

// 1x1 透明 PNG
const DETAILS_ICON: &str = "data:image/png;base64,\
    iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAQAAAC1HAwCAAAAC0lEQVR42mNkYAAAAAYAAjCB0C8AAAAASUVORK5CYII=";

/// 内置的示例通知。
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Showcase {
    /// 快递追踪：远程图片、分组布局与上下文菜单按钮
    Parcel,
    /// 来电：圆形头像、下拉框与图标按钮
    Call,
    /// 文件保存：进度条绑定与后续更新
    File,
    /// 电量：图标字体渲染的应用图标
    Battery,
    /// 全部文本样式
    Typography,
}

impl Showcase {
    /// 构造示例通知与初始绑定数据。
    pub fn build(self, app_id: &str) -> (Toast, Bindings) {
        let toast = match self {
            Showcase::Parcel => parcel(),
            Showcase::Call => call(),
            Showcase::File => file(),
            Showcase::Battery => battery(),
            Showcase::Typography => typography(),
        }
        .with_app_id(app_id);
        let data = match self {
            Showcase::File => file_progress(4),
            _ => Bindings::new(),
        };
        (toast, data)
    }
}

/// 文件示例在第 `done` 张（共 9 张）时的绑定数据。
pub fn file_progress(done: u32) -> Bindings {
    let value = f64::from(done.min(9)) / 9.0;
    Bindings::new()
        .with("value", format!("{:.2}", value))
        .with("status", format!("{} of 9", done.min(9)))
}

fn parcel() -> Toast {
    Toast::new()
        .with(Text::new("Out for delivery"))
        .with(Text::new("Courier will arrive to your doorstep soon!"))
        .with(Image::new("https://iili.io/J2vidJf.jpg"))
        .with(Group::new().column(
            Subgroup::new().push(Text::new("18 mins left").with_style(TextStyle::Title)),
        ))
        .with(
            Group::new()
                .column(
                    Subgroup::new()
                        .push(Text::new("Track number").with_style(TextStyle::BaseSubtle))
                        .push(Text::new("Carrier").with_style(TextStyle::BaseSubtle)),
                )
                .column(
                    Subgroup::new()
                        .push(Text::new("A123B456C789").with_style(TextStyle::Base))
                        .push(Text::new("FooBar Postal Services").with_style(TextStyle::Base)),
                ),
        )
        .with(Button::new("Dismiss", "dismiss").with_icon("https://iili.io/iIT76B.png"))
        .with(Button::new("Open details", "open").with_icon(DETAILS_ICON))
        .with(Button::new("Stop tracking", "stop").context_menu())
}

fn call() -> Toast {
    Toast::new()
        .with_scenario(Scenario::IncomingCall)
        .with(Text::new("Benjamin").centered())
        .with(Text::new("Incoming call").centered())
        .with(Image::new("https://iili.io/JXeSMtj.png").circle())
        .with(
            Select::new("select")
                .option("q0", "Decline with a canned reply")
                .option("q1", "Can you call back later?")
                .option("q2", "I'll call you back.")
                .option("q3", "Please text me.")
                .with_default("q0"),
        )
        .with(
            Button::new("Decline", "decline")
                .with_icon("icon://U+E778")
                .with_style(ButtonStyle::Critical),
        )
        .with(
            Button::new("Accept", "accept")
                .with_icon("icon://U+E717")
                .with_style(ButtonStyle::Success),
        )
}

fn file() -> Toast {
    Toast::new()
        .with_arguments("click")
        .with_tag("album")
        .with_group("downloads")
        .with(Image::new("https://iili.io/JXeLQJR.png").with_placement(ImagePlacement::Hero))
        .with(Text::new("Saving album"))
        .with(Text::new("Amy shared \"Caturday\""))
        .with(
            Progress::new("{value}")
                .with_status("{status}")
                .with_title("IMG-12_09_2020.jpg")
                .with_display_value("1.4 MB/s"),
        )
        .with(Button::new("Show details", "ms-settings:about").protocol())
}

fn battery() -> Toast {
    Toast::new()
        .with(
            Image::new("icon://EBB5?foreground=#FFFFFF&background=#F7630C&padding=40")
                .with_placement(ImagePlacement::Logo),
        )
        .with(Text::new("Fully charged"))
        .with(Text::new("100%"))
        .with(Text::new("in 1 hr 45 min"))
}

fn typography() -> Toast {
    let styles = [
        ("H1", TextStyle::Header, TextStyle::HeaderSubtle),
        ("H2", TextStyle::Subheader, TextStyle::SubheaderSubtle),
        ("H3", TextStyle::Title, TextStyle::TitleSubtle),
        ("H4", TextStyle::Subtitle, TextStyle::SubtitleSubtle),
        ("H5", TextStyle::Base, TextStyle::BaseSubtle),
        ("H6", TextStyle::Body, TextStyle::BodySubtle),
    ];
    let mut regular = Subgroup::new();
    let mut subtle = Subgroup::new();
    for (label, style, subtle_style) in styles {
        regular = regular.push(Text::new(label).with_style(style));
        subtle = subtle.push(Text::new(label).with_style(subtle_style));
    }
    Toast::new()
        .with(Text::new("First line becomes bold"))
        .with(Text::new("Up to 3 lines can be added"))
        .with(Text::new("To add more use groups"))
        .with(
            Group::new()
                .column(regular.push(Text::new("Text")))
                .column(subtle.push(Text::new("Text"))),
        )
}

#[cfg(test)]
mod tests {
    use super::*;
    use toastbox_markup::{SerializeOptions, serialize};

    #[test]
    fn test_showcases_are_valid() {
        for showcase in Showcase::value_variants() {
            let (toast, _) = showcase.build("Toastbox.Demo");
            assert!(
                serialize(&toast, &SerializeOptions::default()).is_ok(),
                "{:?} failed validation",
                showcase
            );
        }
    }

    #[test]
    fn test_file_progress() {
        let data = file_progress(4);
        assert_eq!(data.get("value"), Some("0.44"));
        assert_eq!(data.get("status"), Some("4 of 9"));
        assert_eq!(file_progress(12).get("status"), Some("9 of 9"));
    }
}
